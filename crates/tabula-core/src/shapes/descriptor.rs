//! Wire form of a shape as exchanged with the server.

use crate::floor::LayerName;
use crate::id::GlobalId;
use crate::systems::ShapeProperties;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Rendering options attached to a shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeOptions {
    /// Helper geometry drawn by tools; hidden from most queries.
    #[serde(default)]
    pub ui_helper: bool,
    /// Kept in the layer but never drawn.
    #[serde(default)]
    pub skip_draw: bool,
}

/// A numeric bar shown on a shape (hit points and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub uuid: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub max_value: f64,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub draw: bool,
    #[serde(default)]
    pub primary_color: String,
    #[serde(default)]
    pub secondary_color: String,
}

/// Partial tracker update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerDelta {
    pub name: Option<String>,
    pub value: Option<f64>,
    pub max_value: Option<f64>,
    pub visible: Option<bool>,
    pub draw: Option<bool>,
}

impl Tracker {
    pub fn new(name: impl Into<String>, value: f64, max_value: f64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            value,
            max_value,
            visible: false,
            draw: false,
            primary_color: String::new(),
            secondary_color: String::new(),
        }
    }

    pub fn apply(&mut self, delta: &TrackerDelta) {
        if let Some(name) = &delta.name {
            self.name.clone_from(name);
        }
        if let Some(value) = delta.value {
            self.value = value;
        }
        if let Some(max_value) = delta.max_value {
            self.max_value = max_value;
        }
        if let Some(visible) = delta.visible {
            self.visible = visible;
        }
        if let Some(draw) = delta.draw {
            self.draw = draw;
        }
    }
}

/// A light or vision radius around a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aura {
    pub uuid: Uuid,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub name: String,
    /// Bright radius.
    #[serde(default)]
    pub value: f64,
    /// Additional dim radius beyond `value`.
    #[serde(default)]
    pub dim: f64,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub vision_source: bool,
    #[serde(default)]
    pub colour: String,
    /// Cone width in degrees; 360 for a full circle.
    #[serde(default = "full_circle")]
    pub angle: f64,
    #[serde(default)]
    pub direction: f64,
}

fn full_circle() -> f64 {
    360.0
}

impl Aura {
    /// An active, visible aura that does not act as a vision source.
    pub fn new(name: impl Into<String>, value: f64, dim: f64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            active: true,
            name: name.into(),
            value,
            dim,
            visible: true,
            vision_source: false,
            colour: String::new(),
            angle: full_circle(),
            direction: 0.0,
        }
    }

    /// Outer radius of the aura.
    pub fn extent(&self) -> f64 {
        self.value + self.dim
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub uuid: Uuid,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub visible: bool,
}

/// Per-user access grant on a shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeOwner {
    pub user: String,
    #[serde(default)]
    pub edit_access: bool,
    #[serde(default)]
    pub vision_access: bool,
    #[serde(default)]
    pub movement_access: bool,
}

fn default_badge() -> u32 {
    1
}

/// Full server representation of a shape.
///
/// The fields common to every variant are named; the variant payload (size,
/// radius, vertices, text, asset source, ...) is kept in `data` and decoded by
/// the shape factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerShape {
    pub uuid: GlobalId,
    pub type_: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub angle: f64,
    /// Floor name.
    pub floor: String,
    pub layer: LayerName,
    #[serde(default)]
    pub fill_colour: String,
    #[serde(default)]
    pub stroke_colour: String,
    #[serde(default)]
    pub stroke_width: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_badge")]
    pub badge: u32,
    #[serde(default)]
    pub show_badge: bool,
    /// Leader of the group this shape belongs to.
    #[serde(default)]
    pub group: Option<GlobalId>,
    #[serde(default)]
    pub options: ShapeOptions,
    #[serde(default)]
    pub trackers: Vec<Tracker>,
    #[serde(default)]
    pub auras: Vec<Aura>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub owners: Vec<ShapeOwner>,
    #[serde(default)]
    pub is_token: bool,
    #[serde(default)]
    pub is_invisible: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub blocks_vision: bool,
    #[serde(default)]
    pub blocks_movement: bool,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ServerShape {
    /// Descriptor with default styling and an empty variant payload.
    pub fn new(uuid: GlobalId, type_: &str, x: f64, y: f64, floor: &str, layer: LayerName) -> Self {
        Self {
            uuid,
            type_: type_.to_string(),
            x,
            y,
            angle: 0.0,
            floor: floor.to_string(),
            layer,
            fill_colour: "#000".to_string(),
            stroke_colour: "rgba(0,0,0,0)".to_string(),
            stroke_width: 2.0,
            name: String::new(),
            badge: 1,
            show_badge: false,
            group: None,
            options: ShapeOptions::default(),
            trackers: Vec::new(),
            auras: Vec::new(),
            labels: Vec::new(),
            owners: Vec::new(),
            is_token: false,
            is_invisible: false,
            is_locked: false,
            blocks_vision: false,
            blocks_movement: false,
            data: Map::new(),
        }
    }

    /// The property flags carried by this descriptor.
    pub fn properties(&self) -> ShapeProperties {
        ShapeProperties {
            is_token: self.is_token,
            is_invisible: self.is_invisible,
            is_locked: self.is_locked,
            blocks_vision: self.blocks_vision,
            blocks_movement: self.blocks_movement,
        }
    }

    pub fn set_properties(&mut self, properties: ShapeProperties) {
        self.is_token = properties.is_token;
        self.is_invisible = properties.is_invisible;
        self.is_locked = properties.is_locked;
        self.blocks_vision = properties.blocks_vision;
        self.blocks_movement = properties.blocks_movement;
    }

    /// Builder-style setter for a variant payload field.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }
}

/// Serialize a variant payload into a descriptor data map.
pub(crate) fn to_map<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            log::error!("Variant payload serialized to non-object {other}");
            Map::new()
        }
        Err(e) => {
            log::error!("Failed to serialize variant payload: {e}");
            Map::new()
        }
    }
}
