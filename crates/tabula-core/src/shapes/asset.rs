//! Image asset shape.

use super::rectangle::corners;
use super::{Paint, ShapeGeometry, to_map};
use crate::render::Painter;
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A rectangle filled with an image loaded by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    /// Top-left corner.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Image source, relative to the server origin.
    pub src: String,
}

/// Variant payload of an `assetrect` descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetData {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub src: String,
}

impl Asset {
    pub fn new(position: Point, width: f64, height: f64, src: impl Into<String>) -> Self {
        Self {
            position,
            width,
            height,
            src: src.into(),
        }
    }

    pub fn from_data(position: Point, data: AssetData) -> Self {
        Self::new(position, data.width, data.height, data.src)
    }

    pub fn as_rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }
}

impl ShapeGeometry for Asset {
    fn type_name(&self) -> &'static str {
        "assetrect"
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
        to_map(&AssetData {
            width: self.width,
            height: self.height,
            src: self.src.clone(),
        })
    }

    fn draw(&self, painter: &mut dyn Painter, paint: &Paint) {
        painter.draw_image(&self.src, self.as_rect(), paint.transform);
    }
}
