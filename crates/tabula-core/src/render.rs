//! Drawing seam between layers and the host canvas.
//!
//! The core never rasterizes anything itself. Layers walk their shapes and
//! issue calls on a [`Painter`] supplied by the host.

use crate::floor::LayerKey;
use crate::id::ShapeRegistry;
use crate::selection::Selection;
use crate::shapes::Shape;
use crate::systems::Systems;
use kurbo::{Affine, BezPath, Point, Rect, Size};
use peniko::Color;
use uuid::Uuid;

/// Drawing surface for one layer.
pub trait Painter {
    /// Canvas size in device pixels.
    fn size(&self) -> Size;

    /// Region of the world currently on screen.
    fn viewport(&self) -> Rect;

    fn clear(&mut self);

    fn fill_path(&mut self, path: &BezPath, color: Color);

    fn stroke_path(&mut self, path: &BezPath, color: Color, width: f64);

    fn fill_text(&mut self, text: &str, font: &str, position: Point, angle: f64, color: Color);

    fn draw_image(&mut self, src: &str, rect: Rect, transform: Affine);

    /// Render the auras of `shape`. Aura geometry is owned by the host.
    fn draw_auras(&mut self, shape: &Shape);

    /// Cover the entire canvas with `color`.
    fn fill_screen(&mut self, color: Color);
}

/// Label-based visibility filter applied during draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFilters {
    /// Labelled shapes must carry at least one of these. Empty admits all.
    pub labels: Vec<Uuid>,
    /// Hide shapes that carry no label at all.
    pub hide_unlabeled: bool,
}

impl LabelFilters {
    pub fn admits(&self, shape: &Shape) -> bool {
        if shape.labels.is_empty() {
            return !self.hide_unlabeled;
        }
        self.labels.is_empty() || shape.labels.iter().any(|l| self.labels.contains(&l.uuid))
    }
}

/// Read-only state a layer needs while drawing.
pub struct DrawScene<'a> {
    pub registry: &'a ShapeRegistry,
    pub systems: &'a Systems,
    pub selection: &'a Selection,
    pub filters: &'a LabelFilters,
    /// Layer currently receiving input.
    pub active_layer: Option<LayerKey>,
    /// Top layer of the floor beneath the current one; it gets the floor shadow.
    pub shadowed_layer: Option<LayerKey>,
    pub selection_color: Color,
    pub selection_width: f64,
    pub floor_shadow: Color,
}

/// Parse a colour string as the server sends it.
///
/// Accepts `transparent`, `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r,g,b)` and
/// `rgba(r,g,b,a)` with `a` in `0..=1`. Anything else is black.
pub fn parse_colour(colour: &str) -> Color {
    let colour = colour.trim();
    if colour == "transparent" {
        return Color::from_rgba8(0, 0, 0, 0);
    }

    if let Some(hex) = colour.strip_prefix('#') {
        let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0);
        match hex.len() {
            3 => {
                let r = channel(&hex[0..1]) * 17;
                let g = channel(&hex[1..2]) * 17;
                let b = channel(&hex[2..3]) * 17;
                return Color::from_rgba8(r, g, b, 255);
            }
            6 => {
                return Color::from_rgba8(
                    channel(&hex[0..2]),
                    channel(&hex[2..4]),
                    channel(&hex[4..6]),
                    255,
                );
            }
            8 => {
                return Color::from_rgba8(
                    channel(&hex[0..2]),
                    channel(&hex[2..4]),
                    channel(&hex[4..6]),
                    channel(&hex[6..8]),
                );
            }
            _ => {}
        }
    }

    let functional = colour
        .strip_prefix("rgba(")
        .or_else(|| colour.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'));
    if let Some(args) = functional {
        let parts: Vec<f64> = args
            .split(',')
            .filter_map(|p| p.trim().parse::<f64>().ok())
            .collect();
        let byte = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        match parts.as_slice() {
            [r, g, b] => return Color::from_rgba8(byte(*r), byte(*g), byte(*b), 255),
            [r, g, b, a] => {
                return Color::from_rgba8(byte(*r), byte(*g), byte(*b), byte(a * 255.0));
            }
            _ => {}
        }
    }

    Color::from_rgba8(0, 0, 0, 255)
}

/// Black or white, whichever reads better on top of `background`.
pub fn most_readable(background: Color) -> Color {
    let rgba = background.to_rgba8();
    let luminance =
        0.299 * f64::from(rgba.r) + 0.587 * f64::from(rgba.g) + 0.114 * f64::from(rgba.b);
    if luminance > 127.5 {
        Color::from_rgba8(0, 0, 0, 255)
    } else {
        Color::from_rgba8(255, 255, 255, 255)
    }
}

/// Painter that records every call, for tests.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct RecordingPainter {
    pub viewport: Rect,
    pub calls: Vec<PaintCall>,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PaintCall {
    Clear,
    Fill([u8; 4]),
    Stroke([u8; 4], f64),
    Text(String),
    Image(String),
    Auras(Uuid),
    Screen([u8; 4]),
}

#[cfg(test)]
pub(crate) fn rgba(color: Color) -> [u8; 4] {
    let c = color.to_rgba8();
    [c.r, c.g, c.b, c.a]
}

#[cfg(test)]
impl RecordingPainter {
    pub fn new() -> Self {
        Self {
            viewport: Rect::new(-1000.0, -1000.0, 1000.0, 1000.0),
            calls: Vec::new(),
        }
    }

    pub fn count(&self, pred: impl Fn(&PaintCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

#[cfg(test)]
impl Painter for RecordingPainter {
    fn size(&self) -> Size {
        Size::new(800.0, 600.0)
    }

    fn viewport(&self) -> Rect {
        self.viewport
    }

    fn clear(&mut self) {
        self.calls.push(PaintCall::Clear);
    }

    fn fill_path(&mut self, _path: &BezPath, color: Color) {
        self.calls.push(PaintCall::Fill(rgba(color)));
    }

    fn stroke_path(&mut self, _path: &BezPath, color: Color, width: f64) {
        self.calls.push(PaintCall::Stroke(rgba(color), width));
    }

    fn fill_text(&mut self, text: &str, _font: &str, _position: Point, _angle: f64, _color: Color) {
        self.calls.push(PaintCall::Text(text.to_string()));
    }

    fn draw_image(&mut self, src: &str, _rect: Rect, _transform: Affine) {
        self.calls.push(PaintCall::Image(src.to_string()));
    }

    fn draw_auras(&mut self, shape: &Shape) {
        self.calls.push(PaintCall::Auras(shape.global_id));
    }

    fn fill_screen(&mut self, color: Color) {
        self.calls.push(PaintCall::Screen(rgba(color)));
    }
}
