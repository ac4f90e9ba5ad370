//! Undo/redo stacks of reversible operations.

use crate::id::GlobalId;
use crate::layer::RemoveOptions;
use crate::session::Session;
use crate::shapes::ServerShape;
use crate::sync::{InvalidationMode, SyncMode, UiEvent};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of operations kept per stack unless configured otherwise.
pub const DEFAULT_UNDO_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeMovement {
    pub uuid: GlobalId,
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeRotation {
    pub uuid: GlobalId,
    pub from: f64,
    pub to: f64,
}

/// An undoable change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    Movement {
        shapes: Vec<ShapeMovement>,
    },
    Rotation {
        shapes: Vec<ShapeRotation>,
        center: Point,
    },
    #[serde(rename = "shapeadd")]
    ShapeAdd {
        shapes: Vec<ServerShape>,
    },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Movement { .. } => "movement",
            Operation::Rotation { .. } => "rotation",
            Operation::ShapeAdd { .. } => "shapeadd",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Undo,
    Redo,
}

#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Operation>,
    redo: VecDeque<Operation>,
    limit: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(Some(DEFAULT_UNDO_LIMIT))
    }
}

impl History {
    /// `None` keeps every operation.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            limit,
        }
    }

    /// Record a fresh operation. Anything that could be redone is discarded.
    pub fn add_operation(&mut self, operation: Operation) {
        self.redo.clear();
        Self::push(&mut self.undo, operation, self.limit);
    }

    fn push(stack: &mut VecDeque<Operation>, operation: Operation, limit: Option<usize>) {
        stack.push_back(operation);
        if let Some(limit) = limit {
            while stack.len() > limit {
                stack.pop_front();
            }
        }
    }

    /// Pop the next operation to replay in `direction`.
    pub fn take(&mut self, direction: Direction) -> Option<Operation> {
        match direction {
            Direction::Undo => self.undo.pop_back(),
            Direction::Redo => self.redo.pop_back(),
        }
    }

    /// Push a replayed operation onto the opposite stack.
    pub fn restore(&mut self, direction: Direction, operation: Operation) {
        let stack = match direction {
            Direction::Undo => &mut self.redo,
            Direction::Redo => &mut self.undo,
        };
        Self::push(stack, operation, self.limit);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

/// Apply the inverse (undo) or the original (redo) of an operation.
///
/// The session must have been opened with a replaying recorder.
pub(crate) fn replay(session: &mut Session<'_>, operation: &Operation, direction: Direction) {
    debug_assert!(session.cx.recorder.is_replaying());
    log::debug!("Replaying {} operation ({direction:?})", operation.kind());

    match operation {
        Operation::Movement { shapes } => {
            let Some(first) = shapes.first() else {
                return;
            };
            let mut delta = first.from - first.to;
            if direction == Direction::Redo {
                delta = -delta;
            }
            let ids = session.resolve_all(shapes.iter().map(|s| s.uuid), "Movement replay");
            session.move_shapes(&ids, delta, SyncMode::FullSync);
        }
        Operation::Rotation { shapes, center } => {
            let Some(first) = shapes.first() else {
                return;
            };
            let mut angle = first.from - first.to;
            if direction == Direction::Redo {
                angle = -angle;
            }
            let ids = session.resolve_all(shapes.iter().map(|s| s.uuid), "Rotation replay");
            session.rotate_shapes(&ids, angle, *center, SyncMode::FullSync);
            session.cx.outbox.notify(UiEvent::RotationHelperReset);
        }
        Operation::ShapeAdd { shapes } => match direction {
            Direction::Undo => {
                let ids = session.resolve_all(shapes.iter().map(|s| s.uuid), "Shape add undo");
                for id in ids {
                    session.remove_shape(id, RemoveOptions::new(SyncMode::FullSync));
                }
            }
            Direction::Redo => {
                for desc in shapes {
                    session.add_server_shape(desc, SyncMode::FullSync, InvalidationMode::WithLight);
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn movement(x: f64) -> Operation {
        Operation::Movement {
            shapes: vec![ShapeMovement {
                uuid: Uuid::new_v4(),
                from: Point::ZERO,
                to: Point::new(x, 0.0),
            }],
        }
    }

    #[test]
    fn test_add_operation_clears_redo() {
        let mut history = History::default();
        history.add_operation(movement(1.0));
        let op = history.take(Direction::Undo).unwrap();
        history.restore(Direction::Undo, op);
        assert!(history.can_redo());

        history.add_operation(movement(2.0));
        assert!(!history.can_redo());
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn test_take_and_restore_alternate_stacks() {
        let mut history = History::default();
        history.add_operation(movement(1.0));
        history.add_operation(movement(2.0));

        let op = history.take(Direction::Undo).unwrap();
        match &op {
            Operation::Movement { shapes } => assert_eq!(shapes[0].to.x, 2.0),
            other => panic!("unexpected {other:?}"),
        }
        history.restore(Direction::Undo, op.clone());
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.redo_len(), 1);

        let redone = history.take(Direction::Redo).unwrap();
        assert_eq!(redone, op);
        history.restore(Direction::Redo, redone);
        assert_eq!(history.undo_len(), 2);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_stacks_yield_nothing() {
        let mut history = History::default();
        assert!(history.take(Direction::Undo).is_none());
        assert!(history.take(Direction::Redo).is_none());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::with_limit(Some(3));
        for i in 0..5 {
            history.add_operation(movement(i as f64));
        }
        assert_eq!(history.undo_len(), 3);
        match history.undo.front().cloned().unwrap() {
            Operation::Movement { shapes } => assert_eq!(shapes[0].to.x, 2.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unbounded_history() {
        let mut history = History::with_limit(None);
        for i in 0..100 {
            history.add_operation(movement(i as f64));
        }
        assert_eq!(history.undo_len(), 100);
        history.clear();
        assert!(!history.can_undo());
    }

    #[test]
    fn test_operation_serializes_with_type_tag() {
        let value = serde_json::to_value(movement(3.0)).unwrap();
        assert_eq!(value["type"], "movement");
        assert_eq!(value["shapes"][0]["to"]["x"], 3.0);
    }
}
