//! Hooks for client mods.
//!
//! Mods are loaded by the host. The core only calls into them at a few fixed
//! points: when a game opens, when a location finishes loading and before a
//! tracker changes.

use crate::error::ModError;
use crate::floor::Floors;
use crate::id::{LocalId, ShapeRegistry};
use crate::shapes::{Shape, Tracker, TrackerDelta};

/// Read-only view of the game handed to [`Mod::init_game`].
pub struct ModLoad<'a> {
    pub registry: &'a ShapeRegistry,
    pub floors: &'a Floors,
}

impl ModLoad<'_> {
    pub fn get_shape(&self, id: LocalId) -> Option<&Shape> {
        self.registry.get(id)
    }
}

pub trait Mod {
    fn init_game(&mut self, _load: &ModLoad<'_>) -> Result<(), ModError> {
        Ok(())
    }

    fn load_location(&mut self) -> Result<(), ModError> {
        Ok(())
    }

    /// Inspect or rewrite a tracker change before it is applied.
    fn pre_tracker_update(
        &mut self,
        _id: LocalId,
        _tracker: &Tracker,
        delta: TrackerDelta,
    ) -> TrackerDelta {
        delta
    }
}

struct LoadedMod {
    name: String,
    module: Box<dyn Mod>,
}

/// Registered mods, called in registration order.
#[derive(Default)]
pub struct ModEvents {
    mods: Vec<LoadedMod>,
}

impl std::fmt::Debug for ModEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.mods.iter().map(|m| &m.name)).finish()
    }
}

impl ModEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, module: Box<dyn Mod>) {
        let name = name.into();
        log::info!("Registered mod {name}");
        self.mods.push(LoadedMod { name, module });
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    /// Initialise every mod. A failing mod is logged and does not stop the others.
    pub fn game_opened(&mut self, load: &ModLoad<'_>) {
        for LoadedMod { name, module } in &mut self.mods {
            if let Err(e) = module.init_game(load) {
                log::error!("Failed to call init_game on mod {name}: {e}");
            }
        }
    }

    /// Notify every mod, stopping at the first failure.
    pub fn location_loaded(&mut self) -> Result<(), ModError> {
        for LoadedMod { module, .. } in &mut self.mods {
            module.load_location()?;
        }
        Ok(())
    }

    /// Thread a tracker change through every mod.
    pub fn pre_tracker_update(
        &mut self,
        id: LocalId,
        tracker: &Tracker,
        delta: TrackerDelta,
    ) -> TrackerDelta {
        self.mods
            .iter_mut()
            .fold(delta, |delta, m| m.module.pre_tracker_update(id, tracker, delta))
    }
}
