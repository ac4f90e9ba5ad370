//! In-memory subsystem implementations for standalone use and testing.

use super::{
    AccessSystem, BlockerKind, CompositeSystem, GroupSystem, InitiativeSystem, MarkerSystem,
    PropertiesSystem, ShapeProperties, VisionSystem,
};
use crate::floor::FloorId;
use crate::id::{GlobalId, LocalId};
use crate::shapes::ShapeOwner;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct PropertyStore {
    properties: HashMap<LocalId, ShapeProperties>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropertiesSystem for PropertyStore {
    fn inform(&mut self, id: LocalId, properties: ShapeProperties) {
        self.properties.insert(id, properties);
    }

    fn get(&self, id: LocalId) -> Option<ShapeProperties> {
        self.properties.get(&id).copied()
    }

    fn set_invisible(&mut self, id: LocalId, invisible: bool) {
        match self.properties.get_mut(&id) {
            Some(props) => props.is_invisible = invisible,
            None => log::warn!("No properties to update for {id}"),
        }
    }

    fn set_locked(&mut self, id: LocalId, locked: bool) {
        match self.properties.get_mut(&id) {
            Some(props) => props.is_locked = locked,
            None => log::warn!("No properties to update for {id}"),
        }
    }

    fn drop_shape(&mut self, id: LocalId) {
        self.properties.remove(&id);
    }
}

/// Ownership-based access control for a single user.
///
/// The DM has every access right. Other users get the rights granted to
/// them in a shape's owner list.
#[derive(Debug)]
pub struct AccessControl {
    user: String,
    is_dm: bool,
    owners: HashMap<LocalId, Vec<ShapeOwner>>,
    owned_tokens: HashSet<LocalId>,
    /// Tokens the user is viewing through. Empty means all owned tokens.
    active_tokens: HashSet<LocalId>,
}

impl AccessControl {
    pub fn new(user: impl Into<String>, is_dm: bool) -> Self {
        Self {
            user: user.into(),
            is_dm,
            owners: HashMap::new(),
            owned_tokens: HashSet::new(),
            active_tokens: HashSet::new(),
        }
    }

    pub fn dm() -> Self {
        Self::new("dm", true)
    }

    pub fn player(user: impl Into<String>) -> Self {
        Self::new(user, false)
    }

    pub fn set_active_tokens(&mut self, tokens: impl IntoIterator<Item = LocalId>) {
        self.active_tokens = tokens.into_iter().collect();
    }

    fn grant(&self, id: LocalId, check: impl Fn(&ShapeOwner) -> bool) -> bool {
        self.is_dm
            || self
                .owners
                .get(&id)
                .is_some_and(|owners| owners.iter().any(|o| o.user == self.user && check(o)))
    }
}

impl AccessSystem for AccessControl {
    fn inform(&mut self, id: LocalId, owners: &[ShapeOwner]) {
        self.owners.insert(id, owners.to_vec());
    }

    fn owners(&self, id: LocalId) -> Vec<ShapeOwner> {
        self.owners.get(&id).cloned().unwrap_or_default()
    }

    fn has_edit_access(&self, id: LocalId) -> bool {
        self.grant(id, |o| o.edit_access)
    }

    fn has_vision_access(&self, id: LocalId, limit_to_active_tokens: bool) -> bool {
        if !self.grant(id, |o| o.vision_access || o.edit_access) {
            return false;
        }
        if limit_to_active_tokens
            && !self.active_tokens.is_empty()
            && self.owned_tokens.contains(&id)
        {
            return self.active_tokens.contains(&id);
        }
        true
    }

    fn add_owned_token(&mut self, id: LocalId) {
        self.owned_tokens.insert(id);
    }

    fn remove_owned_token(&mut self, id: LocalId) {
        self.owned_tokens.remove(&id);
        self.active_tokens.remove(&id);
    }

    fn is_owned_token(&self, id: LocalId) -> bool {
        self.owned_tokens.contains(&id)
    }

    fn drop_shape(&mut self, id: LocalId) {
        self.owners.remove(&id);
    }
}

/// Blocker and vision source bookkeeping, without any triangulation.
#[derive(Debug, Default)]
pub struct VisionState {
    blockers: HashMap<(BlockerKind, FloorId), HashSet<LocalId>>,
    sources: HashMap<FloorId, HashMap<LocalId, HashSet<Uuid>>>,
    /// Number of immediate recalculations requested.
    pub recalculations: usize,
    /// Floors whose lighting was invalidated, in order.
    pub light_invalidations: Vec<FloorId>,
}

impl VisionState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VisionSystem for VisionState {
    fn set_blocker(
        &mut self,
        kind: BlockerKind,
        floor: FloorId,
        id: LocalId,
        blocks: bool,
        recalculate: bool,
    ) {
        let set = self.blockers.entry((kind, floor)).or_default();
        let changed = if blocks { set.insert(id) } else { set.remove(&id) };
        if changed && recalculate {
            self.recalculations += 1;
        }
    }

    fn remove_blocker(
        &mut self,
        kind: BlockerKind,
        floor: FloorId,
        id: LocalId,
        recalculate: bool,
    ) -> bool {
        let removed = self
            .blockers
            .get_mut(&(kind, floor))
            .is_some_and(|set| set.remove(&id));
        if removed && recalculate {
            self.recalculations += 1;
        }
        removed
    }

    fn is_blocker(&self, kind: BlockerKind, floor: FloorId, id: LocalId) -> bool {
        self.blockers
            .get(&(kind, floor))
            .is_some_and(|set| set.contains(&id))
    }

    fn add_vision_source(&mut self, floor: FloorId, id: LocalId, aura: Uuid) {
        self.sources
            .entry(floor)
            .or_default()
            .entry(id)
            .or_default()
            .insert(aura);
    }

    fn remove_vision_sources(&mut self, floor: FloorId, id: LocalId) -> bool {
        self.sources
            .get_mut(&floor)
            .and_then(|shapes| shapes.remove(&id))
            .is_some_and(|auras| !auras.is_empty())
    }

    fn invalidate_light(&mut self, floor: FloorId) {
        self.light_invalidations.push(floor);
    }
}

#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: HashMap<GlobalId, Vec<GlobalId>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GroupSystem for GroupRegistry {
    fn add_member(&mut self, leader: GlobalId, member: GlobalId) {
        let members = self.groups.entry(leader).or_default();
        if !members.contains(&member) {
            members.push(member);
        }
    }

    fn remove_member(&mut self, leader: GlobalId, member: GlobalId) {
        if let Some(members) = self.groups.get_mut(&leader) {
            members.retain(|m| *m != member);
            if members.is_empty() {
                self.groups.remove(&leader);
            }
        }
    }

    fn change_leader(&mut self, leader: GlobalId, members: &[GlobalId]) {
        for list in self.groups.values_mut() {
            list.retain(|m| !members.contains(m) && *m != leader);
        }
        self.groups.retain(|_, list| !list.is_empty());
        let mut new_members: Vec<GlobalId> =
            members.iter().copied().filter(|m| *m != leader).collect();
        new_members.dedup();
        self.groups.insert(leader, new_members);
    }

    fn members(&self, leader: GlobalId) -> Vec<GlobalId> {
        self.groups.get(&leader).cloned().unwrap_or_default()
    }
}

/// Composite system for sessions without composite shapes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoComposites;

impl CompositeSystem for NoComposites {
    fn expand(&self, shapes: &[LocalId]) -> Vec<LocalId> {
        shapes.to_vec()
    }
}

#[derive(Debug, Default)]
pub struct InitiativeList {
    entries: Vec<LocalId>,
}

impl InitiativeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: LocalId) {
        if !self.entries.contains(&id) {
            self.entries.push(id);
        }
    }
}

impl InitiativeSystem for InitiativeList {
    fn remove_initiative(&mut self, id: LocalId, sync: bool) {
        self.entries.retain(|e| *e != id);
        log::debug!("Removed initiative entry {id} (sync: {sync})");
    }

    fn has_initiative(&self, id: LocalId) -> bool {
        self.entries.contains(&id)
    }
}

#[derive(Debug, Default)]
pub struct MarkerSet {
    markers: HashSet<LocalId>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: LocalId) {
        self.markers.insert(id);
    }
}

impl MarkerSystem for MarkerSet {
    fn remove_marker(&mut self, id: LocalId, _sync: bool) {
        self.markers.remove(&id);
    }

    fn has_marker(&self, id: LocalId) -> bool {
        self.markers.contains(&id)
    }
}
