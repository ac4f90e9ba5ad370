//! Circle shape.

use super::{ShapeGeometry, to_map};
use kurbo::{BezPath, Circle as KurboCircle, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A circle anchored at its centre.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
    /// Cone of view in degrees for vision-limited tokens.
    pub viewing_angle: Option<f64>,
}

/// Variant payload of a `circle` descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleData {
    pub radius: f64,
    #[serde(default)]
    pub viewing_angle: Option<f64>,
}

impl Circle {
    pub fn new(center: Point, radius: f64) -> Self {
        Self {
            center,
            radius,
            viewing_angle: None,
        }
    }

    pub fn from_data(center: Point, data: CircleData) -> Self {
        Self {
            center,
            radius: data.radius,
            viewing_angle: data.viewing_angle,
        }
    }

    pub(crate) fn data(&self) -> CircleData {
        CircleData {
            radius: self.radius,
            viewing_angle: self.viewing_angle,
        }
    }
}

impl ShapeGeometry for Circle {
    fn type_name(&self) -> &'static str {
        "circle"
    }

    fn ref_point(&self) -> Point {
        self.center
    }

    fn bounds(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius,
            self.center.y - self.radius,
            self.center.x + self.radius,
            self.center.y + self.radius,
        )
    }

    fn center(&self) -> Point {
        self.center
    }

    fn translate(&mut self, delta: Vec2) {
        self.center += delta;
    }

    fn snap_points(&self) -> Vec<Point> {
        vec![self.center]
    }

    fn to_path(&self) -> BezPath {
        KurboCircle::new(self.center, self.radius).to_path(0.1)
    }

    fn payload(&self) -> Map<String, Value> {
        to_map(&self.data())
    }
}
