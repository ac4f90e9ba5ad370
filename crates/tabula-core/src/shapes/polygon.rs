//! Polygon and polyline shape.

use super::{Paint, ShapeGeometry, to_map};
use crate::render::Painter;
use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A polygon whose first vertex is the reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub origin: Point,
    /// Remaining vertices in absolute coordinates.
    pub vertices: Vec<Point>,
    pub line_width: f64,
    /// Drawn as a polyline without the closing edge.
    pub open: bool,
}

/// Variant payload of a `polygon` descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonData {
    #[serde(default)]
    pub vertices: Vec<[f64; 2]>,
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    #[serde(default)]
    pub open_polygon: bool,
}

fn default_line_width() -> f64 {
    2.0
}

impl Polygon {
    pub fn new(origin: Point, vertices: Vec<Point>) -> Self {
        Self {
            origin,
            vertices,
            line_width: default_line_width(),
            open: false,
        }
    }

    pub fn from_data(origin: Point, data: PolygonData) -> Self {
        Self {
            origin,
            vertices: data.vertices.iter().map(|&[x, y]| Point::new(x, y)).collect(),
            line_width: data.line_width,
            open: data.open_polygon,
        }
    }

    pub(crate) fn data(&self) -> PolygonData {
        PolygonData {
            vertices: self.vertices.iter().map(|p| [p.x, p.y]).collect(),
            line_width: self.line_width,
            open_polygon: self.open,
        }
    }

    /// Origin followed by every other vertex.
    pub fn all_points(&self) -> Vec<Point> {
        std::iter::once(self.origin)
            .chain(self.vertices.iter().copied())
            .collect()
    }
}

impl ShapeGeometry for Polygon {
    fn type_name(&self) -> &'static str {
        "polygon"
    }

    fn ref_point(&self) -> Point {
        self.origin
    }

    fn bounds(&self) -> Rect {
        self.vertices
            .iter()
            .fold(Rect::from_points(self.origin, self.origin), |acc, p| {
                acc.union_pt(*p)
            })
    }

    fn translate(&mut self, delta: Vec2) {
        self.origin += delta;
        for vertex in &mut self.vertices {
            *vertex += delta;
        }
    }

    fn snap_points(&self) -> Vec<Point> {
        self.all_points()
    }

    fn position_repr(&self) -> Vec<Point> {
        self.all_points()
    }

    fn set_position_repr(&mut self, points: &[Point]) -> bool {
        let Some((&origin, rest)) = points.split_first() else {
            return false;
        };
        self.origin = origin;
        self.vertices = rest.to_vec();
        true
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.origin);
        for vertex in &self.vertices {
            path.line_to(*vertex);
        }
        if !self.open {
            path.close_path();
        }
        path
    }

    fn payload(&self) -> Map<String, Value> {
        to_map(&self.data())
    }

    fn draw(&self, painter: &mut dyn Painter, paint: &Paint) {
        let path = paint.transform * self.to_path();
        if !self.open {
            painter.fill_path(&path, paint.fill);
        }
        painter.stroke_path(&path, paint.stroke, self.line_width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Polygon {
        Polygon::new(
            Point::ZERO,
            vec![Point::new(10.0, 0.0), Point::new(0.0, 10.0)],
        )
    }

    #[test]
    fn test_bounds_cover_all_vertices() {
        let bounds = triangle().bounds();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_position_repr_roundtrip() {
        let mut poly = triangle();
        let mut points = poly.position_repr();
        for p in &mut points {
            *p += Vec2::new(5.0, 5.0);
        }
        assert!(poly.set_position_repr(&points));
        assert_eq!(poly.origin, Point::new(5.0, 5.0));
        assert_eq!(poly.vertices.len(), 2);
    }
}
