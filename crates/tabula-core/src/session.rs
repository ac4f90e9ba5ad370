//! Mutable views over board state handed to mutators.
//!
//! [`Board`](crate::board::Board) owns everything. A [`Session`] splits it
//! into the floors (which own the layers) and a [`SyncContext`] holding
//! everything a layer touches while it mutates. Layers and shapes therefore
//! never reach for global state.

use crate::config::{ClientConfig, VisionMode};
use crate::factory;
use crate::floor::{FloorId, Floors, LayerKey};
use crate::history::{History, Operation};
use crate::id::{GlobalId, LocalId, ShapeRegistry};
use crate::layer::RemoveOptions;
use crate::location::LocationSettings;
use crate::selection::Selection;
use crate::shapes::{ServerShape, Shape, ShapeOwner};
use crate::sync::{ClientMessage, InvalidationMode, Outbox, SyncMode};
use crate::systems::{ShapeProperties, Systems};

/// Where undoable operations go.
///
/// Replays of the history run with [`Recorder::Replay`], so nothing they do
/// can push onto the stacks being replayed.
#[derive(Debug)]
pub enum Recorder<'a> {
    Live(&'a mut History),
    Replay,
}

impl Recorder<'_> {
    pub fn add_operation(&mut self, operation: Operation) {
        match self {
            Recorder::Live(history) => history.add_operation(operation),
            Recorder::Replay => {
                log::debug!("Not recording {} operation during replay", operation.kind());
            }
        }
    }

    pub fn is_replaying(&self) -> bool {
        matches!(self, Recorder::Replay)
    }
}

/// An image the host has to load before an asset can be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLoad {
    pub src: String,
    pub layer: LayerKey,
}

/// Everything a layer mutation may touch besides the layer itself.
pub struct SyncContext<'a> {
    pub registry: &'a mut ShapeRegistry,
    pub systems: &'a mut Systems,
    pub outbox: &'a mut Outbox,
    pub selection: &'a mut Selection,
    pub locations: &'a mut LocationSettings,
    pub recorder: Recorder<'a>,
    pub image_loads: &'a mut Vec<ImageLoad>,
    /// Layer receiving input when the session was opened.
    pub active_layer: Option<LayerKey>,
}

impl SyncContext<'_> {
    pub fn is_active(&self, key: LayerKey) -> bool {
        self.active_layer == Some(key)
    }
}

pub struct Session<'a> {
    pub floors: &'a mut Floors,
    pub cx: SyncContext<'a>,
    pub config: &'a ClientConfig,
}

impl Session<'_> {
    /// Resolve server ids, logging and skipping the unknown ones.
    pub fn resolve_all(
        &self,
        globals: impl IntoIterator<Item = GlobalId>,
        context: &str,
    ) -> Vec<LocalId> {
        globals
            .into_iter()
            .filter_map(|global| {
                let id = self.cx.registry.local_id(global);
                if id.is_none() {
                    log::warn!("{context}: unknown shape {global}");
                }
                id
            })
            .collect()
    }

    pub fn layer_key_of(&self, id: LocalId) -> Option<LayerKey> {
        self.cx.registry.get(id).and_then(|s| s.layer)
    }

    /// Hand a shape to the registry and inform the subsystems about it.
    pub fn register(
        &mut self,
        shape: Shape,
        properties: ShapeProperties,
        owners: &[ShapeOwner],
    ) -> LocalId {
        let id = self.cx.registry.register(shape);
        self.cx.systems.properties.inform(id, properties);
        self.cx.systems.access.inform(id, owners);
        id
    }

    /// Register a locally created shape and add it to `key`.
    pub fn add_shape(
        &mut self,
        key: LayerKey,
        shape: Shape,
        properties: ShapeProperties,
        sync: SyncMode,
        invalidate: InvalidationMode,
    ) -> Option<LocalId> {
        if self.floors.layer(key).is_none() {
            log::warn!("Attempted to add shape to unknown layer {key}");
            return None;
        }
        if let Some(existing) = self.cx.registry.local_id(shape.global_id) {
            log::warn!("Shape {} already exists, replacing it", shape.global_id);
            self.remove_shape(existing, RemoveOptions::new(SyncMode::NoSync));
        }
        let id = self.register(shape, properties, &[]);
        let layer = self.floors.layer_mut(key)?;
        layer.add_shape(&mut self.cx, id, sync, invalidate);
        Some(id)
    }

    /// Build a shape from a server descriptor and add it to the layer it names.
    pub fn add_server_shape(
        &mut self,
        desc: &ServerShape,
        sync: SyncMode,
        invalidate: InvalidationMode,
    ) -> Option<LocalId> {
        let Some(key) = self.floors.key_by_name(&desc.floor, desc.layer) else {
            log::warn!(
                "Shape {} targets unknown layer {}/{}",
                desc.uuid,
                desc.floor,
                desc.layer
            );
            return None;
        };
        self.add_descriptor(key, desc, sync, invalidate)
    }

    fn add_descriptor(
        &mut self,
        key: LayerKey,
        desc: &ServerShape,
        sync: SyncMode,
        invalidate: InvalidationMode,
    ) -> Option<LocalId> {
        if self.floors.layer(key).is_none() {
            log::warn!("Attempted to add shape {} to unknown layer {key}", desc.uuid);
            return None;
        }
        let Some(shape) = factory::create_shape(desc) else {
            log::warn!("Shape with unknown type {} could not be added", desc.type_);
            return None;
        };
        if let Some(existing) = self.cx.registry.local_id(desc.uuid) {
            log::warn!("Shape {} already exists, replacing it", desc.uuid);
            self.remove_shape(existing, RemoveOptions::new(SyncMode::NoSync));
        }

        let src = shape.asset_src().map(str::to_string);
        let id = self.register(shape, desc.properties(), &desc.owners);
        if let Some(leader) = desc.group {
            self.cx.systems.groups.add_member(leader, desc.uuid);
        }
        if let Some(src) = src {
            self.cx.image_loads.push(ImageLoad { src, layer: key });
        }

        let layer = self.floors.layer_mut(key)?;
        layer.add_shape(&mut self.cx, id, sync, invalidate);
        Some(id)
    }

    /// Replace the contents of a layer with server state.
    ///
    /// Composite shapes go in last so the shapes they refer to already exist.
    pub fn set_server_shapes(&mut self, key: LayerKey, shapes: &[ServerShape]) {
        if self.cx.is_active(key) {
            self.cx.selection.clear();
        }
        let invalidate = match self.config.vision_mode {
            VisionMode::TriangleIterative => InvalidationMode::WithLight,
            VisionMode::Triangle => InvalidationMode::No,
        };
        let (composites, plain): (Vec<&ServerShape>, Vec<&ServerShape>) =
            shapes.iter().partition(|s| s.type_ == "togglecomposite");
        for desc in plain.into_iter().chain(composites) {
            self.add_descriptor(key, desc, SyncMode::NoSync, invalidate);
        }
    }

    /// Remove a shape from whatever layer holds it.
    pub fn remove_shape(&mut self, id: LocalId, options: RemoveOptions) -> bool {
        let Some(key) = self.layer_key_of(id) else {
            log::error!("Attempted to remove shape {id} that is not in a layer");
            return false;
        };
        let Some(layer) = self.floors.layer_mut(key) else {
            log::error!("Shape {id} refers to missing layer {key}");
            return false;
        };
        layer.remove_shape(&mut self.cx, id, options)
    }

    /// Server representation of a live shape.
    pub fn descriptor_of(&self, id: LocalId) -> Option<ServerShape> {
        let shape = self.cx.registry.get(id)?;
        let properties = self.cx.systems.properties.get(id).unwrap_or_default();
        let owners = self.cx.systems.access.owners(id);
        let floor = shape
            .layer
            .and_then(|key| self.floors.floor_name(key.floor))
            .unwrap_or_default();
        Some(shape.to_descriptor(&properties, owners, floor))
    }

    /// Mutate a shape in place, keeping its layer's snap index in step.
    pub fn mutate_shape<R>(&mut self, id: LocalId, f: impl FnOnce(&mut Shape) -> R) -> Option<R> {
        let shape = self.cx.registry.get_mut(id)?;
        let old = if shape.snappable { shape.points() } else { Vec::new() };
        let result = f(shape);
        let new = if shape.snappable { shape.points() } else { Vec::new() };
        if let Some(layer) = shape.layer.and_then(|key| self.floors.layer_mut(key)) {
            if layer.contains(id) {
                layer.reindex(id, &old, &new);
            }
        }
        Some(result)
    }

    /// Invalidate the layer holding `id`. Lighting is recomputed when the
    /// shape affects vision.
    pub fn invalidate_shape(&mut self, id: LocalId) {
        let Some(shape) = self.cx.registry.get(id) else {
            return;
        };
        let properties = self.cx.systems.properties.get(id).unwrap_or_default();
        let skip_light = !shape.triggers_vision_recalc(&properties);
        if let Some(layer) = shape.layer.and_then(|key| self.floors.layer_mut(key)) {
            layer.invalidate(skip_light);
        }
    }

    /// Switch the current floor and re-target the active layer.
    pub fn select_floor(&mut self, floor: FloorId) -> bool {
        if !self.floors.select_floor(floor) {
            return false;
        }
        self.cx.selection.clear();
        self.cx.active_layer = self.floors.current_layer_key();
        for layer in self.floors.layers_mut() {
            layer.invalidate(true);
        }
        true
    }

    /// Make `member` part of the group led by `leader`.
    pub fn add_group_member(&mut self, leader: GlobalId, member: GlobalId, sync: bool) {
        self.cx.systems.groups.add_member(leader, member);
        if let Some(id) = self.cx.registry.local_id(member) {
            if let Some(shape) = self.cx.registry.get_mut(id) {
                shape.group_leader = Some(leader);
            }
        }
        if sync {
            self.cx
                .outbox
                .send(ClientMessage::GroupMemberAdd { leader, member });
        }
    }
}
