//! Shape identifiers and the arena that owns every live shape.

use crate::shapes::Shape;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Process-local shape identifier. Never sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(u32);

impl LocalId {
    /// Raw numeric value.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Server-assigned identifier, stable across clients.
pub type GlobalId = Uuid;

/// Owns every shape known to this client, keyed by [`LocalId`], and keeps the
/// GlobalId to LocalId mapping in step with it.
#[derive(Debug, Default)]
pub struct ShapeRegistry {
    shapes: HashMap<LocalId, Shape>,
    by_global: HashMap<GlobalId, LocalId>,
    next_id: u32,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a shape and hand out its local id.
    ///
    /// A shape whose GlobalId is already registered replaces the previous
    /// instance under the existing local id.
    pub fn register(&mut self, shape: Shape) -> LocalId {
        if let Some(&id) = self.by_global.get(&shape.global_id) {
            log::warn!("Shape {} registered twice, replacing {id}", shape.global_id);
            self.shapes.insert(id, shape);
            return id;
        }
        let id = LocalId(self.next_id);
        self.next_id += 1;
        self.by_global.insert(shape.global_id, id);
        self.shapes.insert(id, shape);
        id
    }

    pub fn get(&self, id: LocalId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn get_mut(&mut self, id: LocalId) -> Option<&mut Shape> {
        self.shapes.get_mut(&id)
    }

    pub fn contains(&self, id: LocalId) -> bool {
        self.shapes.contains_key(&id)
    }

    /// Resolve a server id to the local id of the live shape.
    pub fn local_id(&self, global: GlobalId) -> Option<LocalId> {
        self.by_global.get(&global).copied()
    }

    pub fn global_id(&self, id: LocalId) -> Option<GlobalId> {
        self.shapes.get(&id).map(|s| s.global_id)
    }

    /// Release a local id and hand the shape back to the caller.
    pub fn drop_id(&mut self, id: LocalId) -> Option<Shape> {
        let shape = self.shapes.remove(&id)?;
        if self.by_global.get(&shape.global_id) == Some(&id) {
            self.by_global.remove(&shape.global_id);
        }
        Some(shape)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocalId, &Shape)> {
        self.shapes.iter().map(|(id, shape)| (*id, shape))
    }
}
