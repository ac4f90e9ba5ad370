//! Building shapes from server descriptors.

use crate::error::DescriptorError;
use crate::shapes::{
    Asset, AssetData, Circle, CircleData, CircularToken, CircularTokenData, Line, LineData,
    Polygon, PolygonData, Rectangle, RectangleData, ServerShape, Shape, ShapeKind, Text, TextData,
};
use kurbo::{Point, Vec2};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

fn payload<T: DeserializeOwned>(desc: &ServerShape) -> Result<T, DescriptorError> {
    serde_json::from_value(Value::Object(desc.data.clone())).map_err(|source| {
        DescriptorError::Payload {
            kind: desc.type_.clone(),
            source,
        }
    })
}

/// Decode the variant geometry of a descriptor. `Ok(None)` for unknown types.
fn create_kind(desc: &ServerShape) -> Result<Option<ShapeKind>, DescriptorError> {
    let origin = Point::new(desc.x, desc.y);
    let kind = match desc.type_.as_str() {
        "rect" => {
            ShapeKind::Rectangle(Rectangle::from_data(origin, payload::<RectangleData>(desc)?))
        }
        "circle" => ShapeKind::Circle(Circle::from_data(origin, payload::<CircleData>(desc)?)),
        "circulartoken" => ShapeKind::CircularToken(CircularToken::from_data(
            origin,
            payload::<CircularTokenData>(desc)?,
        )),
        "line" => ShapeKind::Line(Line::from_data(origin, payload::<LineData>(desc)?)),
        "polygon" => ShapeKind::Polygon(Polygon::from_data(origin, payload::<PolygonData>(desc)?)),
        "text" => ShapeKind::Text(Text::from_data(origin, payload::<TextData>(desc)?)),
        "assetrect" => {
            let mut data = payload::<AssetData>(desc)?;
            data.src = resolve_asset_src(&data.src);
            ShapeKind::Asset(Asset::from_data(origin, data))
        }
        _ => return Ok(None),
    };
    Ok(Some(kind))
}

/// Build a shape from its server representation.
///
/// Returns `None` for unknown types and malformed payloads; both are logged.
pub fn create_shape(desc: &ServerShape) -> Option<Shape> {
    let kind = match create_kind(desc) {
        Ok(Some(kind)) => kind,
        Ok(None) => {
            log::warn!("Unknown shape type {} for {}", desc.type_, desc.uuid);
            return None;
        }
        Err(e) => {
            log::error!("Failed to build shape {}: {e}", desc.uuid);
            return None;
        }
    };
    let mut shape = Shape::new(desc.uuid, kind);
    shape.load_descriptor(desc);
    Some(shape)
}

/// Absolute http(s) asset urls are reduced to their path so they load from
/// the current server. Anything else is used as-is.
pub fn resolve_asset_src(src: &str) -> String {
    if !src.starts_with("http") {
        return src.to_string();
    }
    match Url::parse(src) {
        Ok(url) => url.path().to_string(),
        Err(e) => {
            log::warn!("Could not parse asset url {src}: {e}");
            src.to_string()
        }
    }
}

/// Shift a descriptor, including the absolute coordinates of its payload.
pub fn translate_descriptor(desc: &mut ServerShape, offset: Vec2) {
    desc.x += offset.x;
    desc.y += offset.y;
    match desc.type_.as_str() {
        "line" => {
            for (key, delta) in [("x2", offset.x), ("y2", offset.y)] {
                if let Some(value) = desc.data.get_mut(key) {
                    if let Some(v) = value.as_f64() {
                        *value = Value::from(v + delta);
                    }
                }
            }
        }
        "polygon" => {
            if let Some(Value::Array(vertices)) = desc.data.get_mut("vertices") {
                for vertex in vertices.iter_mut() {
                    if let Value::Array(coords) = vertex {
                        for (coord, delta) in coords.iter_mut().zip([offset.x, offset.y]) {
                            if let Some(v) = coord.as_f64() {
                                *coord = Value::from(v + delta);
                            }
                        }
                    }
                }
            }
        }
        _ => {}
    }
}
