//! Shape definitions for the tabletop.
//!
//! Every shape is a [`Shape`]: the state shared by all variants (ids, colours,
//! trackers, auras, group membership, ...) wrapping one [`ShapeKind`] that holds
//! the variant geometry. The variant set is closed; behaviour common to all
//! variants goes through [`ShapeGeometry`].

mod asset;
mod circle;
mod circular_token;
mod descriptor;
mod line;
mod polygon;
mod rectangle;
mod text;

pub use asset::{Asset, AssetData};
pub use circle::{Circle, CircleData};
pub use circular_token::{CircularToken, CircularTokenData};
pub use descriptor::{
    Aura, Label, ServerShape, ShapeOptions, ShapeOwner, Tracker, TrackerDelta,
};
pub(crate) use descriptor::to_map;
pub use line::{Line, LineData};
pub use polygon::{Polygon, PolygonData};
pub use rectangle::{Rectangle, RectangleData};
pub use text::{Text, TextData};

use crate::floor::{LayerKey, LayerName};
use crate::id::GlobalId;
use crate::render::{Painter, parse_colour};
use crate::systems::ShapeProperties;
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape, Vec2};
use peniko::Color;
use serde_json::{Map, Value};

/// Resolved drawing parameters for one shape.
#[derive(Debug, Clone, Copy)]
pub struct Paint {
    /// Rotation of the shape about its centre.
    pub transform: Affine,
    /// Rotation in radians, for primitives that take an angle directly.
    pub angle: f64,
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f64,
}

/// Capabilities every shape variant provides.
pub trait ShapeGeometry {
    /// Wire name of the variant (`rect`, `circle`, ...).
    fn type_name(&self) -> &'static str;

    /// The point the server stores as `(x, y)`.
    fn ref_point(&self) -> Point;

    /// Axis-aligned bounds before rotation.
    fn bounds(&self) -> Rect;

    /// Rotation pivot.
    fn center(&self) -> Point {
        self.bounds().center()
    }

    fn translate(&mut self, delta: Vec2);

    /// Snap points before rotation is applied.
    fn snap_points(&self) -> Vec<Point>;

    /// Points sent in `Shapes.Position.Update`.
    fn position_repr(&self) -> Vec<Point> {
        vec![self.ref_point()]
    }

    /// Apply a point list received from the server. Returns `false` when the
    /// list does not fit the variant.
    fn set_position_repr(&mut self, points: &[Point]) -> bool {
        let Some(&point) = points.first() else {
            return false;
        };
        self.translate(point - self.ref_point());
        true
    }

    /// Outline path for rendering.
    fn to_path(&self) -> BezPath;

    /// Variant payload for the server descriptor.
    fn payload(&self) -> Map<String, Value>;

    fn draw(&self, painter: &mut dyn Painter, paint: &Paint) {
        let path = paint.transform * self.to_path();
        painter.fill_path(&path, paint.fill);
        painter.stroke_path(&path, paint.stroke, paint.stroke_width);
    }
}

/// Variant geometry of a shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Rectangle(Rectangle),
    Circle(Circle),
    CircularToken(CircularToken),
    Line(Line),
    Polygon(Polygon),
    Text(Text),
    Asset(Asset),
}

impl ShapeKind {
    pub fn geometry(&self) -> &dyn ShapeGeometry {
        match self {
            ShapeKind::Rectangle(s) => s,
            ShapeKind::Circle(s) => s,
            ShapeKind::CircularToken(s) => s,
            ShapeKind::Line(s) => s,
            ShapeKind::Polygon(s) => s,
            ShapeKind::Text(s) => s,
            ShapeKind::Asset(s) => s,
        }
    }

    pub fn geometry_mut(&mut self) -> &mut dyn ShapeGeometry {
        match self {
            ShapeKind::Rectangle(s) => s,
            ShapeKind::Circle(s) => s,
            ShapeKind::CircularToken(s) => s,
            ShapeKind::Line(s) => s,
            ShapeKind::Polygon(s) => s,
            ShapeKind::Text(s) => s,
            ShapeKind::Asset(s) => s,
        }
    }
}

/// A drawable, selectable map entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub global_id: GlobalId,
    pub kind: ShapeKind,
    /// Layer this shape currently lives in. Set by the layer on add.
    pub layer: Option<LayerKey>,
    /// Rotation in radians about [`ShapeGeometry::center`].
    pub angle: f64,
    pub fill_colour: String,
    pub stroke_colour: String,
    pub stroke_width: f64,
    pub name: String,
    pub badge: u32,
    pub show_badge: bool,
    /// Leader of the group this shape belongs to.
    pub group_leader: Option<GlobalId>,
    pub options: ShapeOptions,
    pub trackers: Vec<Tracker>,
    pub auras: Vec<Aura>,
    pub labels: Vec<Label>,
    /// Local-only shape: mutations are never sent to the server.
    pub prevent_sync: bool,
    /// Whether the shape's points go into the layer snap index.
    pub snappable: bool,
}

impl Shape {
    pub fn new(global_id: GlobalId, kind: ShapeKind) -> Self {
        Self {
            global_id,
            kind,
            layer: None,
            angle: 0.0,
            fill_colour: "#000".to_string(),
            stroke_colour: "rgba(0,0,0,0)".to_string(),
            stroke_width: 2.0,
            name: String::new(),
            badge: 1,
            show_badge: false,
            group_leader: None,
            options: ShapeOptions::default(),
            trackers: Vec::new(),
            auras: Vec::new(),
            labels: Vec::new(),
            prevent_sync: false,
            snappable: true,
        }
    }

    pub fn geometry(&self) -> &dyn ShapeGeometry {
        self.kind.geometry()
    }

    pub fn type_name(&self) -> &'static str {
        self.geometry().type_name()
    }

    pub fn ref_point(&self) -> Point {
        self.geometry().ref_point()
    }

    pub fn center(&self) -> Point {
        self.geometry().center()
    }

    /// Unrotated bounds.
    pub fn bounds(&self) -> Rect {
        self.geometry().bounds()
    }

    /// Rotation of the shape about its centre.
    pub fn transform(&self) -> Affine {
        Affine::rotate_about(self.angle, self.center())
    }

    /// Bounds after rotation.
    pub fn world_bounds(&self) -> Rect {
        self.transform().transform_rect_bbox(self.bounds())
    }

    /// Snap points with rotation applied.
    pub fn points(&self) -> Vec<Point> {
        let transform = self.transform();
        self.geometry()
            .snap_points()
            .into_iter()
            .map(|p| transform * p)
            .collect()
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.kind.geometry_mut().translate(delta);
    }

    /// Rotate by `angle` radians around `pivot`, moving the centre accordingly.
    pub fn rotate_around(&mut self, angle: f64, pivot: Point) {
        let center = self.center();
        let moved = Affine::rotate_about(angle, pivot) * center;
        self.kind.geometry_mut().translate(moved - center);
        self.angle += angle;
    }

    pub fn position_repr(&self) -> Vec<Point> {
        self.geometry().position_repr()
    }

    pub fn set_position_repr(&mut self, points: &[Point]) -> bool {
        self.kind.geometry_mut().set_position_repr(points)
    }

    /// Largest radius of any active aura.
    pub fn aura_extent(&self) -> f64 {
        self.auras
            .iter()
            .filter(|a| a.active)
            .map(Aura::extent)
            .fold(0.0, f64::max)
    }

    /// Whether any part of the shape, optionally including its auras, is
    /// within `viewport`.
    pub fn visible_in(&self, viewport: Rect, include_auras: bool) -> bool {
        let mut bounds = self.world_bounds();
        if include_auras {
            let extent = self.aura_extent();
            bounds = bounds.inflate(extent, extent);
        }
        bounds.x0 <= viewport.x1
            && bounds.x1 >= viewport.x0
            && bounds.y0 <= viewport.y1
            && bounds.y1 >= viewport.y0
    }

    pub fn has_vision_source(&self) -> bool {
        self.auras.iter().any(|a| a.active && a.vision_source)
    }

    /// Whether changing this shape forces a vision recomputation.
    pub fn triggers_vision_recalc(&self, properties: &ShapeProperties) -> bool {
        properties.blocks_vision || properties.blocks_movement || self.has_vision_source()
    }

    pub fn asset_src(&self) -> Option<&str> {
        match &self.kind {
            ShapeKind::Asset(asset) => Some(&asset.src),
            _ => None,
        }
    }

    pub fn tracker_mut(&mut self, uuid: uuid::Uuid) -> Option<&mut Tracker> {
        self.trackers.iter_mut().find(|t| t.uuid == uuid)
    }

    /// Copy the variant-independent parts of a descriptor onto this shape.
    pub fn load_descriptor(&mut self, desc: &ServerShape) {
        self.global_id = desc.uuid;
        self.angle = desc.angle;
        self.fill_colour.clone_from(&desc.fill_colour);
        self.stroke_colour.clone_from(&desc.stroke_colour);
        self.stroke_width = desc.stroke_width;
        self.name.clone_from(&desc.name);
        self.badge = desc.badge;
        self.show_badge = desc.show_badge;
        self.group_leader = desc.group;
        self.options = desc.options.clone();
        self.trackers = desc.trackers.clone();
        self.auras = desc.auras.clone();
        self.labels = desc.labels.clone();
    }

    /// Build the server representation of this shape.
    pub fn to_descriptor(
        &self,
        properties: &ShapeProperties,
        owners: Vec<ShapeOwner>,
        floor_name: &str,
    ) -> ServerShape {
        let reference = self.ref_point();
        let layer = self
            .layer
            .map(|key| key.name)
            .unwrap_or(LayerName::Tokens);
        let mut desc = ServerShape::new(
            self.global_id,
            self.type_name(),
            reference.x,
            reference.y,
            floor_name,
            layer,
        );
        desc.angle = self.angle;
        desc.fill_colour.clone_from(&self.fill_colour);
        desc.stroke_colour.clone_from(&self.stroke_colour);
        desc.stroke_width = self.stroke_width;
        desc.name.clone_from(&self.name);
        desc.badge = self.badge;
        desc.show_badge = self.show_badge;
        desc.group = self.group_leader;
        desc.options = self.options.clone();
        desc.trackers = self.trackers.clone();
        desc.auras = self.auras.clone();
        desc.labels = self.labels.clone();
        desc.owners = owners;
        desc.set_properties(*properties);
        desc.data = self.geometry().payload();
        desc
    }

    pub fn paint(&self) -> Paint {
        Paint {
            transform: self.transform(),
            angle: self.angle,
            fill: parse_colour(&self.fill_colour),
            stroke: parse_colour(&self.stroke_colour),
            stroke_width: self.stroke_width,
        }
    }

    pub fn draw(&self, painter: &mut dyn Painter) {
        self.geometry().draw(painter, &self.paint());
    }

    /// Outline plus corner handles marking a selected shape.
    pub fn draw_selection(&self, painter: &mut dyn Painter, color: Color, width: f64) {
        let transform = self.transform();
        let bounds = self.bounds();
        painter.stroke_path(&(transform * bounds.to_path(0.1)), color, width);

        let half = width * 2.0;
        for corner in [
            Point::new(bounds.x0, bounds.y0),
            Point::new(bounds.x1, bounds.y0),
            Point::new(bounds.x1, bounds.y1),
            Point::new(bounds.x0, bounds.y1),
        ] {
            let corner = transform * corner;
            let handle =
                Rect::new(corner.x - half, corner.y - half, corner.x + half, corner.y + half);
            painter.fill_path(&handle.to_path(0.1), color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;
    use uuid::Uuid;

    fn rect_at(x: f64, y: f64) -> Shape {
        Shape::new(
            Uuid::new_v4(),
            ShapeKind::Rectangle(Rectangle::new(Point::new(x, y), 10.0, 20.0)),
        )
    }

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-9
    }

    #[test]
    fn test_translate_moves_ref_point() {
        let mut shape = rect_at(0.0, 0.0);
        shape.translate(Vec2::new(5.0, -5.0));
        assert_eq!(shape.ref_point(), Point::new(5.0, -5.0));
    }

    #[test]
    fn test_points_follow_rotation() {
        let mut shape = rect_at(0.0, 0.0);
        let unrotated = shape.points();
        assert!(unrotated.contains(&Point::new(0.0, 0.0)));

        shape.angle = FRAC_PI_2;
        let rotated = shape.points();
        // Centre (5, 10): the origin corner swings to (15, 5).
        assert!(rotated.iter().any(|p| close(*p, Point::new(15.0, 5.0))));
    }

    #[test]
    fn test_rotate_around_own_center_keeps_position() {
        let mut shape = rect_at(0.0, 0.0);
        let center = shape.center();
        shape.rotate_around(1.0, center);
        assert!(close(shape.center(), center));
        assert!((shape.angle - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rotate_around_pivot_then_back() {
        let mut shape = rect_at(10.0, 0.0);
        let pivot = Point::ZERO;
        let before = shape.ref_point();
        shape.rotate_around(0.7, pivot);
        shape.rotate_around(-0.7, pivot);
        assert!(close(shape.ref_point(), before));
        assert!(shape.angle.abs() < 1e-12);
    }

    #[test]
    fn test_visible_in_includes_auras() {
        let mut shape = rect_at(0.0, 0.0);
        let viewport = Rect::new(100.0, 100.0, 200.0, 200.0);
        assert!(!shape.visible_in(viewport, true));

        shape.auras.push(Aura {
            uuid: Uuid::new_v4(),
            active: true,
            name: "light".to_string(),
            value: 100.0,
            dim: 20.0,
            visible: true,
            vision_source: false,
            colour: "#ff0".to_string(),
            angle: 360.0,
            direction: 0.0,
        });
        assert!(shape.visible_in(viewport, true));
        assert!(!shape.visible_in(viewport, false));
    }

    #[test]
    fn test_descriptor_roundtrip_keeps_common_fields() {
        let mut shape = rect_at(3.0, 4.0);
        shape.name = "door".to_string();
        shape.badge = 3;
        shape.angle = 0.5;
        let props = ShapeProperties {
            blocks_vision: true,
            ..Default::default()
        };
        let desc = shape.to_descriptor(&props, Vec::new(), "ground");
        assert_eq!(desc.type_, "rect");
        assert_eq!((desc.x, desc.y), (3.0, 4.0));
        assert!(desc.blocks_vision);

        let mut other = rect_at(0.0, 0.0);
        other.load_descriptor(&desc);
        assert_eq!(other.global_id, shape.global_id);
        assert_eq!(other.name, "door");
        assert_eq!(other.badge, 3);
    }
}
