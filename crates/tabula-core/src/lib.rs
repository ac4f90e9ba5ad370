//! Tabula Core Library
//!
//! Client-side state synchronization for the Tabula tabletop: a local mirror
//! of server-owned shapes organised into floors and layers, optimistic local
//! edits reconciled with server broadcasts, and an undo/redo history.

pub mod board;
pub mod clipboard;
pub mod config;
pub mod error;
mod events;
pub mod factory;
pub mod floor;
pub mod history;
pub mod id;
pub mod layer;
pub mod location;
pub mod mods;
mod operations;
pub mod render;
pub mod selection;
pub mod session;
pub mod shapes;
pub mod snap;
pub mod sync;
pub mod systems;

pub use board::Board;
pub use clipboard::Clipboard;
pub use config::{ClientConfig, SerializableColor, VisionMode};
pub use error::{ConfigError, DescriptorError, ModError, SyncError, SyncResult};
pub use floor::{FloorId, Floors, LayerKey, LayerName};
pub use history::{Direction, History, Operation};
pub use id::{GlobalId, LocalId, ShapeRegistry};
pub use layer::{Layer, RemoveOptions, ShapeQuery};
pub use location::{LocationId, LocationSettings, SpawnInfo};
pub use mods::{Mod, ModEvents, ModLoad};
pub use render::{LabelFilters, Painter};
pub use selection::Selection;
pub use session::{ImageLoad, Session};
pub use shapes::{ServerShape, Shape, ShapeKind};
pub use snap::{SHAPE_SNAP_THRESHOLD, SnapIndex, SnapResult};
pub use sync::{ClientMessage, InvalidationMode, Outbox, ServerMessage, SyncMode, UiEvent};
pub use systems::{ShapeProperties, Systems};
