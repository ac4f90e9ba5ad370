//! Map floors and the fixed stack of layers each one carries.

use crate::layer::Layer;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FloorId(pub u32);

/// Name of a layer within a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerName {
    Map,
    Grid,
    Tokens,
    Dm,
    /// Fog of war and lighting.
    #[serde(rename = "fow")]
    Lighting,
    Draw,
}

impl LayerName {
    /// Default stack, bottom to top.
    pub const DEFAULT_STACK: [LayerName; 6] = [
        LayerName::Map,
        LayerName::Grid,
        LayerName::Tokens,
        LayerName::Dm,
        LayerName::Lighting,
        LayerName::Draw,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LayerName::Map => "map",
            LayerName::Grid => "grid",
            LayerName::Tokens => "tokens",
            LayerName::Dm => "dm",
            LayerName::Lighting => "fow",
            LayerName::Draw => "draw",
        }
    }

    /// Whether players may edit shapes on this layer.
    pub fn player_editable(self) -> bool {
        matches!(self, LayerName::Tokens | LayerName::Draw)
    }

    pub fn selectable(self) -> bool {
        !matches!(self, LayerName::Grid | LayerName::Lighting)
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one layer: a floor plus a layer name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerKey {
    pub floor: FloorId,
    pub name: LayerName,
}

impl LayerKey {
    pub fn new(floor: FloorId, name: LayerName) -> Self {
        Self { floor, name }
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.floor.0, self.name)
    }
}

#[derive(Debug)]
pub struct Floor {
    pub id: FloorId,
    pub name: String,
    layers: Vec<Layer>,
}

impl Floor {
    pub fn layer(&self, name: LayerName) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name() == name)
    }

    pub fn layer_mut(&mut self, name: LayerName) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.name() == name)
    }

    /// Layers bottom to top.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn top_layer(&self) -> Option<&Layer> {
        self.layers.last()
    }
}

/// All floors of the current location, bottom to top, plus the floor and
/// layer the user is working in.
#[derive(Debug, Default)]
pub struct Floors {
    floors: Vec<Floor>,
    current: usize,
    current_layer: Option<LayerName>,
    next_id: u32,
}

impl Floors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a floor on top of the existing ones.
    pub fn add_floor(&mut self, name: &str, layers: &[LayerName], debug: bool) -> FloorId {
        let id = FloorId(self.next_id);
        self.next_id += 1;
        let layers = layers
            .iter()
            .enumerate()
            .map(|(index, layer)| Layer::new(id, name, *layer, index, debug))
            .collect();
        self.floors.push(Floor {
            id,
            name: name.to_string(),
            layers,
        });
        if self.current_layer.is_none() {
            self.current_layer = Some(LayerName::Tokens);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.floors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }

    pub fn floor(&self, id: FloorId) -> Option<&Floor> {
        self.floors.iter().find(|f| f.id == id)
    }

    pub fn floor_mut(&mut self, id: FloorId) -> Option<&mut Floor> {
        self.floors.iter_mut().find(|f| f.id == id)
    }

    pub fn floor_by_name(&self, name: &str) -> Option<&Floor> {
        self.floors.iter().find(|f| f.name == name)
    }

    pub fn floor_name(&self, id: FloorId) -> Option<&str> {
        self.floor(id).map(|f| f.name.as_str())
    }

    /// Resolve a layer from the floor name used on the wire.
    pub fn key_by_name(&self, floor: &str, layer: LayerName) -> Option<LayerKey> {
        let floor = self.floor_by_name(floor)?;
        floor.layer(layer).map(|l| l.key())
    }

    pub fn layer(&self, key: LayerKey) -> Option<&Layer> {
        self.floor(key.floor)?.layer(key.name)
    }

    pub fn layer_mut(&mut self, key: LayerKey) -> Option<&mut Layer> {
        self.floor_mut(key.floor)?.layer_mut(key.name)
    }

    pub fn layers_mut(&mut self) -> impl Iterator<Item = &mut Layer> {
        self.floors.iter_mut().flat_map(|f| f.layers.iter_mut())
    }

    pub fn current_floor(&self) -> Option<&Floor> {
        self.floors.get(self.current)
    }

    pub fn current_floor_id(&self) -> Option<FloorId> {
        self.current_floor().map(|f| f.id)
    }

    pub fn current_layer_name(&self) -> Option<LayerName> {
        self.current_layer
    }

    /// The layer receiving input, if it exists on the current floor.
    pub fn current_layer_key(&self) -> Option<LayerKey> {
        let floor = self.current_floor()?;
        let name = self.current_layer?;
        floor.layer(name).map(|l| l.key())
    }

    pub fn select_floor(&mut self, id: FloorId) -> bool {
        match self.floors.iter().position(|f| f.id == id) {
            Some(index) => {
                self.current = index;
                true
            }
            None => {
                log::warn!("Attempted to select unknown floor {}", id.0);
                false
            }
        }
    }

    pub fn select_layer(&mut self, name: LayerName) {
        self.current_layer = Some(name);
    }

    /// Top layer of the floor directly below the current one.
    pub fn shadowed_layer(&self) -> Option<LayerKey> {
        let below = self.current.checked_sub(1)?;
        self.floors.get(below)?.top_layer().map(|l| l.key())
    }

    /// Floors whose lighting has been requested since the last call.
    pub fn take_light_requests(&mut self) -> Vec<FloorId> {
        let mut floors = Vec::new();
        for floor in &mut self.floors {
            let mut requested = false;
            for layer in &mut floor.layers {
                requested |= layer.take_light_request();
            }
            if requested {
                floors.push(floor.id);
            }
        }
        floors
    }
}
