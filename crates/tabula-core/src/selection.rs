//! Selected and focused shapes of the active layer.

use crate::id::{GlobalId, LocalId};

/// Selection state.
///
/// `last_focused` survives unfocusing so a shape re-created by the server
/// (undo of a removal, a `Shape.Set`) can be selected again when it lands.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: Vec<LocalId>,
    focused: Option<LocalId>,
    last_focused: Option<GlobalId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> &[LocalId] {
        &self.selected
    }

    pub fn has_selection(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn is_selected(&self, id: LocalId) -> bool {
        self.selected.contains(&id)
    }

    /// Add to the selection, keeping insertion order.
    pub fn push(&mut self, id: LocalId) {
        if !self.selected.contains(&id) {
            self.selected.push(id);
        }
    }

    pub fn set(&mut self, ids: impl IntoIterator<Item = LocalId>) {
        self.selected.clear();
        for id in ids {
            self.push(id);
        }
    }

    /// Deselect `id`, dropping focus if it was focused.
    pub fn remove(&mut self, id: LocalId) {
        self.selected.retain(|s| *s != id);
        if self.focused == Some(id) {
            self.focused = None;
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn focused(&self) -> Option<LocalId> {
        self.focused
    }

    pub fn last_focused(&self) -> Option<GlobalId> {
        self.last_focused
    }

    pub fn focus(&mut self, id: LocalId, global: GlobalId) {
        self.focused = Some(id);
        self.last_focused = Some(global);
    }

    pub fn unfocus(&mut self) {
        self.focused = None;
    }
}
