//! Client configuration.

use crate::error::ConfigError;
use kurbo::Vec2;
use peniko::Color;
use serde::{Deserialize, Serialize};

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// How vision blockers are recomputed after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisionMode {
    /// Incremental triangulation updates. Layer reloads recompute lighting.
    #[default]
    TriangleIterative,
    /// Full rebuild on demand.
    Triangle,
}

/// Tunables of the synchronization core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Outline colour of selected shapes.
    pub selection_color: SerializableColor,
    pub selection_width: f64,
    /// Overlay drawn over the top layer of the floor below the current one.
    pub floor_shadow: SerializableColor,
    /// Paste offset used when the view has barely moved since copying.
    pub paste_fallback_offset: [f64; 2],
    /// Squared distance below which the fallback offset applies.
    pub paste_min_distance_sq: f64,
    /// Maximum undo depth. `None` keeps everything.
    pub undo_limit: Option<usize>,
    /// Trace layer invalidation and draws at `debug` level.
    pub debug_layers: bool,
    pub vision_mode: VisionMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            selection_color: SerializableColor::new(0xCC, 0, 0, 255),
            selection_width: 2.0,
            floor_shadow: SerializableColor::new(0, 0, 0, 77),
            paste_fallback_offset: [10.0, 10.0],
            paste_min_distance_sq: 200.0,
            undo_limit: Some(50),
            debug_layers: false,
            vision_mode: VisionMode::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a config, filling unspecified fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn paste_fallback(&self) -> Vec2 {
        Vec2::new(self.paste_fallback_offset[0], self.paste_fallback_offset[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.selection_color, SerializableColor::new(0xCC, 0, 0, 255));
        assert!((config.selection_width - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.undo_limit, Some(50));
        assert_eq!(config.paste_fallback(), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ClientConfig::from_json(r#"{"undo_limit": 5, "vision_mode": "triangle"}"#).unwrap();
        assert_eq!(config.undo_limit, Some(5));
        assert_eq!(config.vision_mode, VisionMode::Triangle);
        assert!((config.paste_min_distance_sq - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ClientConfig::from_json("{\"undo_limit\": \"many\"}"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_color_conversion() {
        let color: Color = ClientConfig::default().floor_shadow.into();
        assert_eq!(SerializableColor::from(color), SerializableColor::new(0, 0, 0, 77));
    }
}
