//! Copy, paste, cut and delete of the selection.

use crate::factory;
use crate::floor::{LayerKey, LayerName};
use crate::id::{GlobalId, LocalId};
use crate::layer::RemoveOptions;
use crate::session::Session;
use crate::shapes::ServerShape;
use crate::sync::{InvalidationMode, SyncMode, UiEvent};
use kurbo::Point;
use uuid::Uuid;

/// Copied shape descriptors and the screen centre at the time of the copy.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    items: Vec<ServerShape>,
    anchor: Point,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[ServerShape] {
        &self.items
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Session<'_> {
    /// Copy the editable part of the selection.
    pub fn copy_shapes(&self, clipboard: &mut Clipboard, screen_center: Point) {
        if self.cx.active_layer.is_none() || !self.cx.selection.has_selection() {
            return;
        }
        clipboard.items = self
            .cx
            .selection
            .get()
            .iter()
            .filter(|&&id| self.cx.systems.access.has_edit_access(id))
            .filter_map(|&id| self.descriptor_of(id))
            .collect();
        clipboard.anchor = screen_center;
    }

    /// Highest badge among a group leader and its members.
    fn group_badge(&self, leader: GlobalId) -> u32 {
        std::iter::once(leader)
            .chain(self.cx.systems.groups.members(leader))
            .filter_map(|uuid| self.cx.registry.local_id(uuid))
            .filter_map(|id| self.cx.registry.get(id))
            .map(|shape| shape.badge)
            .max()
            .unwrap_or(0)
    }

    /// Paste the clipboard into `target` (the current layer by default),
    /// selecting the new shapes.
    pub fn paste_shapes(
        &mut self,
        clipboard: &mut Clipboard,
        screen_center: Point,
        target: Option<LayerName>,
    ) -> Vec<LocalId> {
        let key = match target {
            Some(name) => self
                .floors
                .current_floor_id()
                .map(|floor| LayerKey::new(floor, name)),
            None => self.floors.current_layer_key(),
        };
        let Some(key) = key.filter(|key| self.floors.layer(*key).is_some()) else {
            log::warn!("No layer to paste into");
            return Vec::new();
        };
        if clipboard.is_empty() {
            return Vec::new();
        }
        self.cx.selection.clear();

        let mut offset = screen_center - clipboard.anchor;
        clipboard.anchor = screen_center;
        if offset.hypot2() < self.config.paste_min_distance_sq {
            offset = self.config.paste_fallback();
        }

        let floor = self.floors.floor_name(key.floor).unwrap_or_default().to_string();
        for clip in &mut clipboard.items {
            factory::translate_descriptor(clip, offset);
            let original = clip.uuid;
            clip.uuid = Uuid::new_v4();
            for tracker in &mut clip.trackers {
                tracker.uuid = Uuid::new_v4();
            }
            for aura in &mut clip.auras {
                aura.uuid = Uuid::new_v4();
            }
            clip.floor.clone_from(&floor);
            clip.layer = key.name;

            let leader = clip.group.unwrap_or(original);
            if self.cx.registry.local_id(leader).is_some() {
                clip.badge = self.group_badge(leader) + 1;
                clip.group = Some(leader);
                self.add_group_member(leader, clip.uuid, true);
            } else {
                log::error!("Missing group leader {leader} on paste");
            }

            let Some(id) =
                self.add_server_shape(clip, SyncMode::FullSync, InvalidationMode::WithLight)
            else {
                continue;
            };
            self.cx.selection.push(id);
        }

        if let Some(layer) = self.floors.layer_mut(key) {
            layer.invalidate(false);
        }
        self.cx.selection.get().to_vec()
    }

    /// Remove the editable part of the selection.
    pub fn delete_shapes(&mut self) {
        if self.cx.active_layer.is_none() {
            log::info!("No active layer selected for delete operation");
            return;
        }
        let selection = self.cx.selection.get().to_vec();
        for &id in selection.iter().rev() {
            if !self.cx.systems.access.has_edit_access(id) {
                continue;
            }
            if self.remove_shape(id, RemoveOptions::new(SyncMode::FullSync)) {
                self.cx.outbox.notify(UiEvent::SelectionInfoCleared);
            }
        }
        self.cx.selection.clear();
    }

    pub fn cut_shapes(&mut self, clipboard: &mut Clipboard, screen_center: Point) {
        self.copy_shapes(clipboard, screen_center);
        self.delete_shapes();
    }
}
