//! Circular token: a circle with a centred text label.

use super::{Circle, CircleData, Paint, ShapeGeometry, to_map};
use crate::render::{Painter, most_readable};
use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct CircularToken {
    pub circle: Circle,
    pub text: String,
    /// CSS font shorthand, e.g. `"20px serif"`.
    pub font: String,
}

/// Variant payload of a `circulartoken` descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircularTokenData {
    #[serde(flatten)]
    pub circle: CircleData,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub font: String,
}

impl CircularToken {
    pub fn new(
        center: Point,
        radius: f64,
        text: impl Into<String>,
        font: impl Into<String>,
    ) -> Self {
        Self {
            circle: Circle::new(center, radius),
            text: text.into(),
            font: font.into(),
        }
    }

    pub fn from_data(center: Point, data: CircularTokenData) -> Self {
        Self {
            circle: Circle::from_data(center, data.circle),
            text: data.text,
            font: data.font,
        }
    }
}

impl ShapeGeometry for CircularToken {
    fn type_name(&self) -> &'static str {
        "circulartoken"
    }

    fn ref_point(&self) -> Point {
        self.circle.ref_point()
    }

    fn bounds(&self) -> Rect {
        self.circle.bounds()
    }

    fn center(&self) -> Point {
        self.circle.center
    }

    fn translate(&mut self, delta: Vec2) {
        self.circle.translate(delta);
    }

    fn snap_points(&self) -> Vec<Point> {
        self.circle.snap_points()
    }

    fn to_path(&self) -> BezPath {
        self.circle.to_path()
    }

    fn payload(&self) -> Map<String, Value> {
        to_map(&CircularTokenData {
            circle: self.circle.data(),
            text: self.text.clone(),
            font: self.font.clone(),
        })
    }

    fn draw(&self, painter: &mut dyn Painter, paint: &Paint) {
        self.circle.draw(painter, paint);
        painter.fill_text(
            &self.text,
            &self.font,
            self.circle.center,
            paint.angle,
            most_readable(paint.fill),
        );
    }
}
