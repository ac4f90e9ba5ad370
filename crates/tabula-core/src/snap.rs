//! Per-layer snap-point index: which shapes occupy which coordinates.

use crate::id::LocalId;
use kurbo::Point;
use std::collections::{HashMap, HashSet};

/// Distance threshold for snapping to an indexed point (in world units).
pub const SHAPE_SNAP_THRESHOLD: f64 = 10.0;

/// Exact hashable form of a point.
///
/// `-0.0` and `0.0` collapse to the same key so that a shape translated back to
/// the origin is still found under the key it was inserted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointKey(u64, u64);

impl PointKey {
    pub fn new(point: Point) -> Self {
        Self((point.x + 0.0).to_bits(), (point.y + 0.0).to_bits())
    }

    pub fn point(self) -> Point {
        Point::new(f64::from_bits(self.0), f64::from_bits(self.1))
    }
}

impl From<Point> for PointKey {
    fn from(point: Point) -> Self {
        Self::new(point)
    }
}

/// Result of a snap lookup.
#[derive(Debug, Clone, Copy)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// Whether an indexed point was close enough to snap to.
    pub snapped: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped: false,
        }
    }
}

/// Map from coordinate to the set of shapes that have a snap point there.
#[derive(Debug, Clone, Default)]
pub struct SnapIndex {
    points: HashMap<PointKey, HashSet<LocalId>>,
}

impl SnapIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, point: Point, id: LocalId) {
        self.points.entry(point.into()).or_default().insert(id);
    }

    /// Remove `id` from the set at `point`, dropping the entry once empty.
    pub fn remove(&mut self, point: Point, id: LocalId) {
        let key = PointKey::new(point);
        if let Some(ids) = self.points.get_mut(&key) {
            ids.remove(&id);
            if ids.is_empty() {
                self.points.remove(&key);
            }
        }
    }

    /// Move a shape's entries from its old points to its new ones.
    pub fn reindex(&mut self, id: LocalId, old: &[Point], new: &[Point]) {
        for &point in old {
            self.remove(point, id);
        }
        for &point in new {
            self.insert(point, id);
        }
    }

    /// Shapes that have a snap point exactly at `point`.
    pub fn ids_at(&self, point: Point) -> Option<&HashSet<LocalId>> {
        self.points.get(&PointKey::new(point))
    }

    pub fn contains(&self, point: Point) -> bool {
        self.points.contains_key(&PointKey::new(point))
    }

    /// Whether `id` is indexed anywhere.
    pub fn indexes(&self, id: LocalId) -> bool {
        self.points.values().any(|ids| ids.contains(&id))
    }

    /// Number of distinct indexed coordinates.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.points.keys().map(|k| k.point())
    }

    /// Snap `point` to the nearest indexed coordinate within `threshold`.
    pub fn snap(&self, point: Point, threshold: f64) -> SnapResult {
        let mut best = None;
        let mut best_dist_sq = threshold * threshold;

        for candidate in self.points() {
            let dist_sq = (candidate - point).hypot2();
            if dist_sq < best_dist_sq {
                best_dist_sq = dist_sq;
                best = Some(candidate);
            }
        }

        match best {
            Some(point) => SnapResult {
                point,
                snapped: true,
            },
            None => SnapResult::none(point),
        }
    }
}
