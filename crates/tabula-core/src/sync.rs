//! Synchronization policy and the server protocol.
//!
//! Every mutator takes a [`SyncMode`] that decides whether the change is sent
//! to the server and whether it is recorded for undo. Outbound messages are
//! queued in the [`Outbox`] and drained by the host transport.

use crate::floor::LayerName;
use crate::id::{GlobalId, LocalId};
use crate::location::{
    LocationChange, LocationClone, LocationId, LocationOptionsSet, LocationRename, SpawnInfo,
};
use crate::shapes::ServerShape;
use futures::channel::oneshot;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Network and history policy of a single mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Local only: inbound server events and internal rebuilds.
    NoSync,
    /// Sent as temporary (drag previews), never recorded.
    TempSync,
    /// Sent as authoritative and recorded for undo.
    FullSync,
}

impl SyncMode {
    pub fn from_bool(sync: bool) -> Self {
        if sync {
            SyncMode::FullSync
        } else {
            SyncMode::NoSync
        }
    }

    pub fn emits(self) -> bool {
        self != SyncMode::NoSync
    }

    pub fn is_temporary(self) -> bool {
        self == SyncMode::TempSync
    }

    pub fn records(self) -> bool {
        self == SyncMode::FullSync
    }
}

/// How far a change invalidates the layer it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationMode {
    No,
    /// Redraw the layer only.
    WithoutLight,
    /// Redraw the layer and recompute the floor's lighting.
    WithLight,
}

impl InvalidationMode {
    pub fn invalidates(self) -> bool {
        self != InvalidationMode::No
    }

    pub fn skips_light(self) -> bool {
        self != InvalidationMode::WithLight
    }
}

/// New point representation of one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub uuid: GlobalId,
    pub points: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

impl PositionUpdate {
    pub fn points(&self) -> Vec<Point> {
        self.points.iter().map(|&[x, y]| Point::new(x, y)).collect()
    }
}

/// Messages sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "Shape.Add")]
    ShapeAdd { shape: ServerShape, temporary: bool },
    #[serde(rename = "Shapes.Remove")]
    ShapesRemove { uuids: Vec<GlobalId>, temporary: bool },
    #[serde(rename = "Shape.Order.Set")]
    ShapeOrderSet {
        uuid: GlobalId,
        index: usize,
        temporary: bool,
    },
    #[serde(rename = "Shapes.Position.Update")]
    ShapesPositionUpdate {
        shapes: Vec<PositionUpdate>,
        temporary: bool,
    },
    #[serde(rename = "Shapes.Floor.Change")]
    ShapesFloorChange { uuids: Vec<GlobalId>, floor: String },
    #[serde(rename = "Shapes.Layer.Change")]
    ShapesLayerChange {
        uuids: Vec<GlobalId>,
        floor: String,
        layer: LayerName,
    },
    #[serde(rename = "Shapes.Group.Member.Add")]
    GroupMemberAdd { leader: GlobalId, member: GlobalId },
    #[serde(rename = "Locations.Order.Set")]
    LocationsOrderSet(Vec<LocationId>),
    #[serde(rename = "Location.Change")]
    LocationChange(LocationChange),
    #[serde(rename = "Location.New")]
    LocationNew(String),
    #[serde(rename = "Location.Rename")]
    LocationRename(LocationRename),
    #[serde(rename = "Location.Delete")]
    LocationDelete(LocationId),
    #[serde(rename = "Location.Archive")]
    LocationArchive(LocationId),
    #[serde(rename = "Location.Unarchive")]
    LocationUnarchive(LocationId),
    #[serde(rename = "Location.Clone")]
    LocationClone(LocationClone),
    #[serde(rename = "Location.Spawn.Info.Get")]
    SpawnInfoGet { request: u64, location: LocationId },
    #[serde(rename = "Location.Options.Set")]
    LocationOptionsSet(LocationOptionsSet),
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvisibleSet {
    pub shape: GlobalId,
    pub is_invisible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedSet {
    pub shape: GlobalId,
    pub is_locked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSet {
    pub uuid: GlobalId,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorChange {
    pub uuids: Vec<GlobalId>,
    pub floor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerChange {
    pub uuids: Vec<GlobalId>,
    pub floor: String,
    pub layer: LayerName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeUpdate {
    pub shape: ServerShape,
    #[serde(default)]
    pub redraw: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLeaderSet {
    pub leader: GlobalId,
    pub members: Vec<GlobalId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub leader: GlobalId,
    pub member: GlobalId,
}

/// Messages received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "Shape.Set")]
    ShapeSet(ServerShape),
    #[serde(rename = "Shape.Options.Invisible.Set")]
    InvisibleSet(InvisibleSet),
    #[serde(rename = "Shape.Options.Locked.Set")]
    LockedSet(LockedSet),
    #[serde(rename = "Shape.Add")]
    ShapeAdd(ServerShape),
    #[serde(rename = "Shapes.Add")]
    ShapesAdd(Vec<ServerShape>),
    #[serde(rename = "Shapes.Remove")]
    ShapesRemove(Vec<GlobalId>),
    #[serde(rename = "Shapes.Position.Update")]
    ShapesPositionUpdate(Vec<PositionUpdate>),
    #[serde(rename = "Shape.Order.Set")]
    ShapeOrderSet(OrderSet),
    #[serde(rename = "Shapes.Floor.Change")]
    ShapesFloorChange(FloorChange),
    #[serde(rename = "Shapes.Layer.Change")]
    ShapesLayerChange(LayerChange),
    #[serde(rename = "Shape.Update")]
    ShapeUpdate(ShapeUpdate),
    #[serde(rename = "Shapes.Group.Leader.Set")]
    GroupLeaderSet(GroupLeaderSet),
    #[serde(rename = "Shapes.Group.Member.Add")]
    GroupMemberAdd(GroupMember),
}

/// Notifications for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// The selection info panel should be cleared.
    SelectionInfoCleared,
    /// The rotation helper must be re-anchored to the selection.
    RotationHelperReset,
    /// A shape was replaced wholesale by the server.
    ShapeSet(LocalId),
}

/// Queue of outbound traffic and UI notifications.
#[derive(Default)]
pub struct Outbox {
    outgoing: Vec<ClientMessage>,
    ui_events: Vec<UiEvent>,
    pub(crate) spawn_requests: HashMap<u64, oneshot::Sender<Vec<SpawnInfo>>>,
    pub(crate) next_request: u64,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, message: ClientMessage) {
        self.outgoing.push(message);
    }

    pub fn notify(&mut self, event: UiEvent) {
        self.ui_events.push(event);
    }

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outgoing)
    }

    /// Take pending outgoing messages encoded as JSON. Messages that fail to
    /// encode are logged and dropped.
    pub fn take_outgoing_json(&mut self) -> Vec<String> {
        self.take_outgoing()
            .into_iter()
            .filter_map(|message| match message.to_json() {
                Ok(json) => Some(json),
                Err(e) => {
                    log::error!("Failed to encode {message:?}: {e}");
                    None
                }
            })
            .collect()
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Pending messages without draining them.
    pub fn outgoing(&self) -> &[ClientMessage] {
        &self.outgoing
    }

    pub fn take_ui_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.ui_events)
    }
}

impl fmt::Debug for Outbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outbox")
            .field("outgoing", &self.outgoing)
            .field("ui_events", &self.ui_events)
            .field("pending_requests", &self.spawn_requests.len())
            .finish()
    }
}
