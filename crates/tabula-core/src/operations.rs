//! Geometry and membership changes applied to several shapes at once.

use crate::floor::{FloorId, LayerKey};
use crate::history::{Operation, ShapeMovement, ShapeRotation};
use crate::id::{GlobalId, LocalId};
use crate::layer::RemoveOptions;
use crate::session::Session;
use crate::sync::{ClientMessage, InvalidationMode, PositionUpdate, SyncMode};
use kurbo::{Point, Vec2};

fn to_pairs(points: &[Point]) -> Vec<[f64; 2]> {
    points.iter().map(|p| [p.x, p.y]).collect()
}

struct Moved {
    uuid: GlobalId,
    prevent_sync: bool,
    points: Vec<Point>,
}

impl Session<'_> {
    /// Whether the local user may move or rotate `id`.
    fn can_transform(&self, id: LocalId) -> bool {
        if !self.cx.systems.access.has_edit_access(id) {
            log::debug!("No edit access to shape {id}");
            return false;
        }
        let locked = self.cx.systems.properties.get(id).is_some_and(|p| p.is_locked);
        !locked
    }

    fn send_positions(&mut self, moved: &[Moved], angles: Option<&[f64]>, sync: SyncMode) {
        if !sync.emits() {
            return;
        }
        let shapes: Vec<PositionUpdate> = moved
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.prevent_sync)
            .map(|(i, m)| PositionUpdate {
                uuid: m.uuid,
                points: to_pairs(&m.points),
                angle: angles.and_then(|a| a.get(i).copied()),
            })
            .collect();
        if !shapes.is_empty() {
            self.cx.outbox.send(ClientMessage::ShapesPositionUpdate {
                shapes,
                temporary: sync.is_temporary(),
            });
        }
    }

    /// Translate shapes by `delta`. Shapes without edit access or locked
    /// shapes are left alone.
    pub fn move_shapes(&mut self, ids: &[LocalId], delta: Vec2, sync: SyncMode) {
        let mut moved = Vec::new();
        let mut movements = Vec::new();
        for &id in ids {
            if !self.can_transform(id) {
                continue;
            }
            let Some((uuid, from, to, prevent_sync, points)) = self.mutate_shape(id, |shape| {
                let from = shape.ref_point();
                shape.translate(delta);
                (
                    shape.global_id,
                    from,
                    shape.ref_point(),
                    shape.prevent_sync,
                    shape.position_repr(),
                )
            }) else {
                log::warn!("Attempted to move unknown shape {id}");
                continue;
            };
            self.invalidate_shape(id);
            movements.push(ShapeMovement { uuid, from, to });
            moved.push(Moved {
                uuid,
                prevent_sync,
                points,
            });
        }

        self.send_positions(&moved, None, sync);
        if sync.records() && !movements.is_empty() {
            self.cx
                .recorder
                .add_operation(Operation::Movement { shapes: movements });
        }
    }

    /// Rotate shapes by `angle` radians around `center`.
    pub fn rotate_shapes(&mut self, ids: &[LocalId], angle: f64, center: Point, sync: SyncMode) {
        let mut moved = Vec::new();
        let mut angles = Vec::new();
        let mut rotations = Vec::new();
        for &id in ids {
            if !self.can_transform(id) {
                continue;
            }
            let Some((uuid, from, to, prevent_sync, points)) = self.mutate_shape(id, |shape| {
                let from = shape.angle;
                shape.rotate_around(angle, center);
                (
                    shape.global_id,
                    from,
                    shape.angle,
                    shape.prevent_sync,
                    shape.position_repr(),
                )
            }) else {
                log::warn!("Attempted to rotate unknown shape {id}");
                continue;
            };
            self.invalidate_shape(id);
            rotations.push(ShapeRotation { uuid, from, to });
            angles.push(to);
            moved.push(Moved {
                uuid,
                prevent_sync,
                points,
            });
        }

        self.send_positions(&moved, Some(&angles), sync);
        if sync.records() && !rotations.is_empty() {
            self.cx.recorder.add_operation(Operation::Rotation {
                shapes: rotations,
                center,
            });
        }
    }

    /// Apply a position update received from the server.
    pub fn apply_position_update(&mut self, update: &PositionUpdate) {
        let Some(id) = self.cx.registry.local_id(update.uuid) else {
            log::warn!("Position update for unknown shape {}", update.uuid);
            return;
        };
        let points = update.points();
        let applied = self.mutate_shape(id, |shape| {
            if let Some(angle) = update.angle {
                shape.angle = angle;
            }
            shape.set_position_repr(&points)
        });
        if applied == Some(false) {
            log::warn!("Position update for {} has {} points", update.uuid, points.len());
        }
        self.invalidate_shape(id);
    }

    /// Detach shapes from their layer and append them to `target`, keeping
    /// their group membership.
    fn relocate(&mut self, ids: &[LocalId], target: LayerKey) -> Vec<GlobalId> {
        let mut moved = Vec::new();
        for &id in ids {
            let Some(shape) = self.cx.registry.get(id) else {
                log::warn!("Attempted to relocate unknown shape {id}");
                continue;
            };
            let global = shape.global_id;
            let leader = shape.group_leader;
            let prevent_sync = shape.prevent_sync;
            if shape.layer == Some(target) {
                continue;
            }
            if shape.layer.is_some() {
                self.remove_shape(
                    id,
                    RemoveOptions {
                        sync: SyncMode::NoSync,
                        recalculate: true,
                        drop_shape_id: false,
                    },
                );
            }
            let Some(layer) = self.floors.layer_mut(target) else {
                log::error!("Attempted to move shape {id} to unknown layer {target}");
                continue;
            };
            layer.add_shape(&mut self.cx, id, SyncMode::NoSync, InvalidationMode::WithLight);
            if let Some(leader) = leader {
                self.cx.systems.groups.add_member(leader, global);
            }
            if !prevent_sync {
                moved.push(global);
            }
        }
        moved
    }

    /// Move shapes to another layer, possibly on another floor.
    pub fn move_to_layer(&mut self, ids: &[LocalId], target: LayerKey, sync: bool) {
        let Some(floor) = self.floors.floor_name(target.floor).map(str::to_string) else {
            log::warn!("Attempted to move shapes to unknown floor {}", target.floor.0);
            return;
        };
        let uuids = self.relocate(ids, target);
        if sync && !uuids.is_empty() {
            self.cx.outbox.send(ClientMessage::ShapesLayerChange {
                uuids,
                floor,
                layer: target.name,
            });
        }
    }

    /// Move shapes to the same-named layer of another floor.
    pub fn move_to_floor(&mut self, ids: &[LocalId], floor: FloorId, sync: bool) {
        let Some(floor_name) = self.floors.floor_name(floor).map(str::to_string) else {
            log::warn!("Attempted to move shapes to unknown floor {}", floor.0);
            return;
        };
        let mut uuids = Vec::new();
        for &id in ids {
            let Some(key) = self.layer_key_of(id) else {
                log::warn!("Shape {id} is not in a layer");
                continue;
            };
            let target = LayerKey::new(floor, key.name);
            if self.floors.layer(target).is_none() {
                log::warn!("Floor {floor_name} has no {} layer", key.name);
                continue;
            }
            uuids.extend(self.relocate(&[id], target));
        }
        if sync && !uuids.is_empty() {
            self.cx.outbox.send(ClientMessage::ShapesFloorChange {
                uuids,
                floor: floor_name,
            });
        }
    }
}
