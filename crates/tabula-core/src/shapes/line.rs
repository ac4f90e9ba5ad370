//! Line segment shape.

use super::{Paint, ShapeGeometry, to_map};
use crate::render::Painter;
use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A straight segment. The start point is the reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub start: Point,
    pub end: Point,
    pub line_width: f64,
}

/// Variant payload of a `line` descriptor. The end point is absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineData {
    pub x2: f64,
    pub y2: f64,
    #[serde(default = "default_line_width")]
    pub line_width: f64,
}

fn default_line_width() -> f64 {
    1.0
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            line_width: default_line_width(),
        }
    }

    pub fn from_data(start: Point, data: LineData) -> Self {
        Self {
            start,
            end: Point::new(data.x2, data.y2),
            line_width: data.line_width,
        }
    }

    pub(crate) fn data(&self) -> LineData {
        LineData {
            x2: self.end.x,
            y2: self.end.y,
            line_width: self.line_width,
        }
    }
}

impl ShapeGeometry for Line {
    fn type_name(&self) -> &'static str {
        "line"
    }

    fn ref_point(&self) -> Point {
        self.start
    }

    fn bounds(&self) -> Rect {
        Rect::from_points(self.start, self.end)
    }

    fn translate(&mut self, delta: Vec2) {
        self.start += delta;
        self.end += delta;
    }

    fn snap_points(&self) -> Vec<Point> {
        vec![self.start, self.end]
    }

    fn position_repr(&self) -> Vec<Point> {
        vec![self.start, self.end]
    }

    fn set_position_repr(&mut self, points: &[Point]) -> bool {
        match points {
            [start, end] => {
                self.start = *start;
                self.end = *end;
                true
            }
            _ => false,
        }
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start);
        path.line_to(self.end);
        path
    }

    fn payload(&self) -> Map<String, Value> {
        to_map(&self.data())
    }

    fn draw(&self, painter: &mut dyn Painter, paint: &Paint) {
        let path = paint.transform * self.to_path();
        painter.stroke_path(&path, paint.stroke, self.line_width);
    }
}
