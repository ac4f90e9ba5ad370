//! Collaborator subsystems the core calls into.
//!
//! Properties, access control, vision, groups, composites, initiative and
//! markers each live behind a trait. The core only needs the narrow operations
//! below. The in-memory implementations re-exported here, such as
//! [`PropertyStore`] and [`AccessControl`], are used by default.

mod memory;

pub use memory::{
    AccessControl, GroupRegistry, InitiativeList, MarkerSet, NoComposites, PropertyStore,
    VisionState,
};

use crate::floor::FloorId;
use crate::id::{GlobalId, LocalId};
use crate::shapes::ShapeOwner;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Gameplay flags of a shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeProperties {
    pub is_token: bool,
    pub is_invisible: bool,
    pub is_locked: bool,
    pub blocks_vision: bool,
    pub blocks_movement: bool,
}

pub trait PropertiesSystem {
    fn inform(&mut self, id: LocalId, properties: ShapeProperties);

    fn get(&self, id: LocalId) -> Option<ShapeProperties>;

    fn set_invisible(&mut self, id: LocalId, invisible: bool);

    fn set_locked(&mut self, id: LocalId, locked: bool);

    fn drop_shape(&mut self, id: LocalId);
}

pub trait AccessSystem {
    fn inform(&mut self, id: LocalId, owners: &[ShapeOwner]);

    fn owners(&self, id: LocalId) -> Vec<ShapeOwner>;

    fn has_edit_access(&self, id: LocalId) -> bool;

    /// With `limit_to_active_tokens`, only the tokens the user currently
    /// views through count.
    fn has_vision_access(&self, id: LocalId, limit_to_active_tokens: bool) -> bool;

    fn add_owned_token(&mut self, id: LocalId);

    fn remove_owned_token(&mut self, id: LocalId);

    fn is_owned_token(&self, id: LocalId) -> bool;

    fn drop_shape(&mut self, id: LocalId);
}

/// Which triangulation a blocker participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockerKind {
    Vision,
    Movement,
}

pub trait VisionSystem {
    /// Add or remove `id` as a blocker. `recalculate` rebuilds immediately.
    fn set_blocker(
        &mut self,
        kind: BlockerKind,
        floor: FloorId,
        id: LocalId,
        blocks: bool,
        recalculate: bool,
    );

    /// Returns whether `id` was a blocker.
    fn remove_blocker(
        &mut self,
        kind: BlockerKind,
        floor: FloorId,
        id: LocalId,
        recalculate: bool,
    ) -> bool;

    fn is_blocker(&self, kind: BlockerKind, floor: FloorId, id: LocalId) -> bool;

    fn add_vision_source(&mut self, floor: FloorId, id: LocalId, aura: Uuid);

    /// Returns whether any source was removed.
    fn remove_vision_sources(&mut self, floor: FloorId, id: LocalId) -> bool;

    /// Lighting for `floor` is stale.
    fn invalidate_light(&mut self, floor: FloorId);
}

pub trait GroupSystem {
    fn add_member(&mut self, leader: GlobalId, member: GlobalId);

    fn remove_member(&mut self, leader: GlobalId, member: GlobalId);

    /// Replace the leader of a group.
    fn change_leader(&mut self, leader: GlobalId, members: &[GlobalId]);

    fn members(&self, leader: GlobalId) -> Vec<GlobalId>;
}

pub trait CompositeSystem {
    /// Expand `shapes` with the composite parents they belong to.
    fn expand(&self, shapes: &[LocalId]) -> Vec<LocalId>;
}

pub trait InitiativeSystem {
    fn remove_initiative(&mut self, id: LocalId, sync: bool);

    fn has_initiative(&self, id: LocalId) -> bool;
}

pub trait MarkerSystem {
    fn remove_marker(&mut self, id: LocalId, sync: bool);

    fn has_marker(&self, id: LocalId) -> bool;
}

/// Every subsystem the core talks to.
pub struct Systems {
    pub properties: Box<dyn PropertiesSystem>,
    pub access: Box<dyn AccessSystem>,
    pub vision: Box<dyn VisionSystem>,
    pub groups: Box<dyn GroupSystem>,
    pub composites: Box<dyn CompositeSystem>,
    pub initiative: Box<dyn InitiativeSystem>,
    pub markers: Box<dyn MarkerSystem>,
}

impl Default for Systems {
    fn default() -> Self {
        Self {
            properties: Box::new(PropertyStore::new()),
            access: Box::new(AccessControl::dm()),
            vision: Box::new(VisionState::new()),
            groups: Box::new(GroupRegistry::new()),
            composites: Box::new(NoComposites),
            initiative: Box::new(InitiativeList::new()),
            markers: Box::new(MarkerSet::new()),
        }
    }
}

impl fmt::Debug for Systems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Systems").finish_non_exhaustive()
    }
}
