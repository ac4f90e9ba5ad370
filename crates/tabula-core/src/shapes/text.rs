//! Text shape.

use super::{Paint, ShapeGeometry, to_map};
use crate::render::Painter;
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Font size used when the font string carries none.
const DEFAULT_FONT_SIZE: f64 = 20.0;

/// A single run of text anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub position: Point,
    pub text: String,
    /// CSS font shorthand, e.g. `"bold 20px serif"`.
    pub font: String,
}

/// Variant payload of a `text` descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextData {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub font: String,
}

impl Text {
    pub fn new(position: Point, text: impl Into<String>, font: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
            font: font.into(),
        }
    }

    pub fn from_data(position: Point, data: TextData) -> Self {
        Self::new(position, data.text, data.font)
    }

    /// Pixel size taken from the first `<n>px` token of the font string.
    pub fn font_size(&self) -> f64 {
        self.font
            .split_whitespace()
            .find_map(|part| part.strip_suffix("px")?.parse::<f64>().ok())
            .unwrap_or(DEFAULT_FONT_SIZE)
    }

    /// Approximate bounds without font metrics.
    fn approximate_size(&self) -> (f64, f64) {
        let size = self.font_size();
        let lines: Vec<&str> = self.text.lines().collect();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let width = longest as f64 * size * 0.6;
        let height = lines.len().max(1) as f64 * size * 1.2;
        (width, height)
    }
}

impl ShapeGeometry for Text {
    fn type_name(&self) -> &'static str {
        "text"
    }

    fn ref_point(&self) -> Point {
        self.position
    }

    fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.approximate_size())
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    fn snap_points(&self) -> Vec<Point> {
        vec![self.position]
    }

    fn to_path(&self) -> BezPath {
        self.bounds().to_path(0.1)
    }

    fn payload(&self) -> Map<String, Value> {
        to_map(&TextData {
            text: self.text.clone(),
            font: self.font.clone(),
        })
    }

    fn draw(&self, painter: &mut dyn Painter, paint: &Paint) {
        painter.fill_text(&self.text, &self.font, self.position, paint.angle, paint.fill);
    }
}
