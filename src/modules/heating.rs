use std::any::Any;
use std::fmt;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use super::{on_off, ControlModule, ModuleContext, ModuleState};
use crate::{error::ensure_finite, events::Category, rng::StreamRng, world::World};

/// Half-width of the AUTO dead band around the target.
const DEAD_BAND: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeatingMode {
    Off,
    Heating,
    Cooling,
    Auto,
}

impl fmt::Display for HeatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HeatingMode::Off => "OFF",
            HeatingMode::Heating => "HEATING",
            HeatingMode::Cooling => "COOLING",
            HeatingMode::Auto => "AUTO",
        })
    }
}

pub struct HeatingSystem {
    enabled: bool,
    mode: HeatingMode,
    target_temperature: f64,
    adjust_rate: f64,
    current_adjustment: f64,
    heating_activations: u64,
    cooling_activations: u64,
}

impl HeatingSystem {
    pub fn new() -> Self {
        Self {
            enabled: true,
            mode: HeatingMode::Auto,
            target_temperature: 65.0,
            adjust_rate: 2.0,
            current_adjustment: 0.0,
            heating_activations: 0,
            cooling_activations: 0,
        }
    }

    pub fn mode(&self) -> HeatingMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: HeatingMode) {
        self.mode = mode;
    }

    pub fn target_temperature(&self) -> f64 {
        self.target_temperature
    }

    pub fn set_target_temperature(&mut self, target: f64) -> Result<()> {
        ensure!(target.is_finite(), "target temperature must be finite");
        self.target_temperature = target;
        Ok(())
    }

    pub fn adjust_rate(&self) -> f64 {
        self.adjust_rate
    }

    pub fn set_adjust_rate(&mut self, rate: f64) -> Result<()> {
        ensure!(
            rate.is_finite() && rate >= 0.0,
            "temperature adjust rate must be a non-negative number, got {rate}"
        );
        self.adjust_rate = rate;
        Ok(())
    }

    pub fn current_adjustment(&self) -> f64 {
        self.current_adjustment
    }

    pub fn heating_activations(&self) -> u64 {
        self.heating_activations
    }

    pub fn cooling_activations(&self) -> u64 {
        self.cooling_activations
    }
}

impl Default for HeatingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlModule for HeatingSystem {
    fn name(&self) -> &'static str {
        "heating"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn update(
        &mut self,
        ctx: &ModuleContext<'_>,
        world: &mut World,
        _rng: &mut StreamRng,
    ) -> Result<()> {
        let current = ensure_finite("temperature", world.conditions().temperature)?;
        match self.mode {
            HeatingMode::Auto => {
                if current < self.target_temperature - DEAD_BAND {
                    self.current_adjustment = self.adjust_rate;
                    self.heating_activations += 1;
                    ctx.events.info(
                        Category::Heating,
                        format!(
                            "Heater ON: current {current:.1}°F, adjusting +{:.1}°F (target: {:.1}°F)",
                            self.adjust_rate, self.target_temperature
                        ),
                    );
                } else if current > self.target_temperature + DEAD_BAND {
                    self.current_adjustment = -self.adjust_rate;
                    self.cooling_activations += 1;
                    ctx.events.info(
                        Category::Heating,
                        format!(
                            "Cooler ON: current {current:.1}°F, adjusting -{:.1}°F (target: {:.1}°F)",
                            self.adjust_rate, self.target_temperature
                        ),
                    );
                } else {
                    if self.current_adjustment != 0.0 {
                        ctx.events.info(
                            Category::Heating,
                            format!("Climate control OFF: {current:.1}°F is within target range"),
                        );
                    }
                    self.current_adjustment = 0.0;
                    return Ok(());
                }
            }
            HeatingMode::Heating => self.current_adjustment = self.adjust_rate,
            HeatingMode::Cooling => self.current_adjustment = -self.adjust_rate,
            HeatingMode::Off => return Ok(()),
        }
        world.adjust_temperature(self.current_adjustment);
        Ok(())
    }

    fn status_summary(&self) -> String {
        format!(
            "Climate Control [{}] | Mode: {} | Target: {:.1}°F | Adj: {:+.1} | Heat: {} | Cool: {}",
            on_off(self.enabled),
            self.mode,
            self.target_temperature,
            self.current_adjustment,
            self.heating_activations,
            self.cooling_activations
        )
    }

    fn state(&self) -> ModuleState {
        ModuleState::Heating {
            enabled: self.enabled,
            mode: self.mode,
            target_temperature: self.target_temperature,
            adjust_rate: self.adjust_rate,
            current_adjustment: self.current_adjustment,
            heating_activations: self.heating_activations,
            cooling_activations: self.cooling_activations,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
