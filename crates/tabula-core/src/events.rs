//! Application of inbound server messages.
//!
//! Every handler mutates with [`SyncMode::NoSync`]: nothing received from the
//! server is sent back or recorded for undo. Unknown ids are logged and
//! skipped without aborting the rest of a batch.

use crate::factory;
use crate::layer::RemoveOptions;
use crate::session::Session;
use crate::shapes::ServerShape;
use crate::sync::{InvalidationMode, ServerMessage, ShapeUpdate, SyncMode, UiEvent};
use crate::systems::BlockerKind;

impl Session<'_> {
    pub fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::ShapeSet(desc) => self.set_shape(&desc),
            ServerMessage::InvisibleSet(msg) => {
                let Some(id) = self.cx.registry.local_id(msg.shape) else {
                    log::warn!("Invisible.Set for unknown shape {}", msg.shape);
                    return;
                };
                self.cx.systems.properties.set_invisible(id, msg.is_invisible);
                self.invalidate_shape(id);
            }
            ServerMessage::LockedSet(msg) => {
                let Some(id) = self.cx.registry.local_id(msg.shape) else {
                    log::warn!("Locked.Set for unknown shape {}", msg.shape);
                    return;
                };
                self.cx.systems.properties.set_locked(id, msg.is_locked);
                self.invalidate_shape(id);
            }
            ServerMessage::ShapeAdd(desc) => {
                self.add_server_shape(&desc, SyncMode::NoSync, InvalidationMode::WithLight);
            }
            ServerMessage::ShapesAdd(shapes) => {
                for desc in &shapes {
                    self.add_server_shape(desc, SyncMode::NoSync, InvalidationMode::WithLight);
                }
            }
            ServerMessage::ShapesRemove(uuids) => {
                for id in self.resolve_all(uuids, "Shapes.Remove") {
                    self.remove_shape(id, RemoveOptions::new(SyncMode::NoSync));
                }
            }
            ServerMessage::ShapesPositionUpdate(updates) => {
                for update in &updates {
                    self.apply_position_update(update);
                }
            }
            ServerMessage::ShapeOrderSet(msg) => {
                let Some(id) = self.cx.registry.local_id(msg.uuid) else {
                    log::warn!("Order.Set for unknown shape {}", msg.uuid);
                    return;
                };
                let Some(layer) = self.layer_key_of(id).and_then(|key| self.floors.layer_mut(key))
                else {
                    log::warn!("Order.Set for shape {} outside any layer", msg.uuid);
                    return;
                };
                layer.move_shape_order(&mut self.cx, id, msg.index, SyncMode::NoSync);
            }
            ServerMessage::ShapesFloorChange(msg) => {
                let Some(floor) = self.floors.floor_by_name(&msg.floor).map(|f| f.id) else {
                    log::warn!("Floor.Change to unknown floor {}", msg.floor);
                    return;
                };
                let ids = self.resolve_all(msg.uuids, "Shapes.Floor.Change");
                self.move_to_floor(&ids, floor, false);
                if ids.iter().any(|&id| self.cx.systems.access.has_edit_access(id)) {
                    self.select_floor(floor);
                }
            }
            ServerMessage::ShapesLayerChange(msg) => {
                let Some(key) = self.floors.key_by_name(&msg.floor, msg.layer) else {
                    log::warn!("Layer.Change to unknown layer {}/{}", msg.floor, msg.layer);
                    return;
                };
                let ids = self.resolve_all(msg.uuids, "Shapes.Layer.Change");
                self.move_to_layer(&ids, key, false);
            }
            ServerMessage::ShapeUpdate(update) => self.update_shape(update),
            ServerMessage::GroupLeaderSet(msg) => {
                self.cx.systems.groups.change_leader(msg.leader, &msg.members);
                for id in self.resolve_all(msg.members, "Group.Leader.Set") {
                    if let Some(shape) = self.cx.registry.get_mut(id) {
                        shape.group_leader = Some(msg.leader);
                    }
                }
            }
            ServerMessage::GroupMemberAdd(msg) => {
                self.add_group_member(msg.leader, msg.member, false);
            }
        }
    }

    /// Replace a shape wholesale.
    fn set_shape(&mut self, desc: &ServerShape) {
        let added = self.add_server_shape(desc, SyncMode::NoSync, InvalidationMode::WithLight);
        if let Some(id) = added {
            self.cx.outbox.notify(UiEvent::ShapeSet(id));
        }
    }

    /// Update a shape in place, keeping its local id and layer.
    fn update_shape(&mut self, update: ShapeUpdate) {
        let ShapeUpdate { shape: desc, redraw } = update;
        let Some(id) = self.cx.registry.local_id(desc.uuid) else {
            log::warn!("Shape.Update for unknown shape {}", desc.uuid);
            return;
        };
        let same_type = self
            .cx
            .registry
            .get(id)
            .is_some_and(|s| s.type_name() == desc.type_);
        if !same_type {
            self.set_shape(&desc);
            return;
        }
        let Some(replacement) = factory::create_shape(&desc) else {
            return;
        };

        let floor = self.mutate_shape(id, move |shape| {
            let layer = shape.layer;
            let prevent_sync = shape.prevent_sync;
            let snappable = shape.snappable;
            *shape = replacement;
            shape.layer = layer;
            shape.prevent_sync = prevent_sync;
            shape.snappable = snappable;
            layer.map(|key| key.floor)
        });

        let properties = desc.properties();
        self.cx.systems.properties.inform(id, properties);
        self.cx.systems.access.inform(id, &desc.owners);
        if let Some(floor) = floor.flatten() {
            let vision = &mut self.cx.systems.vision;
            vision.set_blocker(BlockerKind::Vision, floor, id, properties.blocks_vision, true);
            vision.set_blocker(BlockerKind::Movement, floor, id, properties.blocks_movement, true);
        }
        if redraw {
            self.invalidate_shape(id);
        }
    }
}
