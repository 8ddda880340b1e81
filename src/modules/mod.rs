//! Feedback controllers that read sensors and world state and act on it.

mod heating;
mod lighting;
mod pest_control;
mod watering;

use std::any::Any;

use anyhow::Result;
use serde::Serialize;

use crate::{events::Emitter, rng::StreamRng, world::World};

pub use heating::{HeatingMode, HeatingSystem};
pub use lighting::LightingSystem;
pub use pest_control::{PestControl, PestControlMethod, ORGANIC_KILL_CHANCE};
pub use watering::{Sprinkler, WateringSystem, NUTRIENTS_PER_WATERING, ZONE_SATURATION_LEVEL};

pub struct ModuleContext<'a> {
    pub tick: u64,
    pub events: Emitter<'a>,
}

pub trait ControlModule: Send {
    /// Stable key, also used as the module's RNG stream name.
    fn name(&self) -> &'static str;
    fn is_enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);
    fn update(
        &mut self,
        ctx: &ModuleContext<'_>,
        world: &mut World,
        rng: &mut StreamRng,
    ) -> Result<()>;
    fn status_summary(&self) -> String;

    fn state(&self) -> ModuleState {
        ModuleState::Custom {
            name: self.name().to_string(),
            enabled: self.is_enabled(),
            summary: self.status_summary(),
        }
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Serialisable view of a module for snapshots and the web API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "module", rename_all = "snake_case")]
pub enum ModuleState {
    Watering {
        enabled: bool,
        low_threshold: f64,
        high_threshold: f64,
        watering_events: u64,
        sprinklers: Vec<Sprinkler>,
    },
    Heating {
        enabled: bool,
        mode: HeatingMode,
        target_temperature: f64,
        adjust_rate: f64,
        current_adjustment: f64,
        heating_activations: u64,
        cooling_activations: u64,
    },
    Lighting {
        enabled: bool,
        lights_on: bool,
        observed_light: f64,
        target_light: f64,
        activations: u64,
        on_ticks: u64,
    },
    PestControl {
        enabled: bool,
        method: PestControlMethod,
        threshold: usize,
        check_interval: u32,
        activations: u64,
        eliminated: u64,
        last_activation_tick: Option<u64>,
    },
    Custom {
        name: String,
        enabled: bool,
        summary: String,
    },
}

pub(crate) fn on_off(flag: bool) -> &'static str {
    if flag {
        "ON"
    } else {
        "OFF"
    }
}
