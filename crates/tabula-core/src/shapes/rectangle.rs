//! Rectangle shape.

use super::{ShapeGeometry, to_map};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    /// Top-left corner.
    pub position: Point,
    pub width: f64,
    pub height: f64,
}

/// Variant payload of a `rect` descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectangleData {
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            position,
            width,
            height,
        }
    }

    pub fn from_data(position: Point, data: RectangleData) -> Self {
        Self::new(position, data.width, data.height)
    }

    pub fn as_rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }
}

/// Corners of a rectangle, clockwise from the top-left.
pub(crate) fn corners(rect: Rect) -> Vec<Point> {
    vec![
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}

impl ShapeGeometry for Rectangle {
    fn type_name(&self) -> &'static str {
        "rect"
    }

    fn ref_point(&self) -> Point {
        self.position
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    fn snap_points(&self) -> Vec<Point> {
        corners(self.as_rect())
    }

    fn to_path(&self) -> BezPath {
        self.as_rect().to_path(0.1)
    }

    fn payload(&self) -> Map<String, Value> {
        to_map(&RectangleData {
            width: self.width,
            height: self.height,
        })
    }
}
