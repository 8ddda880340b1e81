use std::any::Any;

use anyhow::{ensure, Result};

use super::{on_off, ControlModule, ModuleContext, ModuleState};
use crate::{error::ensure_finite, events::Category, rng::StreamRng, world::World};

/// Lights switch on once natural light falls this far below target.
const SWITCH_MARGIN: f64 = 10.0;
const SUPPLEMENT_GAIN: f64 = 0.5;

pub struct LightingSystem {
    enabled: bool,
    lights_on: bool,
    observed_light: f64,
    target_light: f64,
    on_ticks: u64,
    activations: u64,
}

impl LightingSystem {
    pub fn new() -> Self {
        Self {
            enabled: true,
            lights_on: false,
            observed_light: 50.0,
            target_light: 60.0,
            on_ticks: 0,
            activations: 0,
        }
    }

    pub fn lights_on(&self) -> bool {
        self.lights_on
    }

    pub fn target_light(&self) -> f64 {
        self.target_light
    }

    pub fn set_target_light(&mut self, target: f64) -> Result<()> {
        ensure!(
            (0.0..=100.0).contains(&target),
            "target light must lie in [0, 100], got {target}"
        );
        self.target_light = target;
        Ok(())
    }

    pub fn activations(&self) -> u64 {
        self.activations
    }

    pub fn on_ticks(&self) -> u64 {
        self.on_ticks
    }
}

impl Default for LightingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlModule for LightingSystem {
    fn name(&self) -> &'static str {
        "lighting"
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
        let light = ensure_finite("light", world.conditions().light)?;
        self.observed_light = light;
        if light < self.target_light - SWITCH_MARGIN {
            if !self.lights_on {
                self.lights_on = true;
                self.activations += 1;
                ctx.events.info(
                    Category::Lighting,
                    format!(
                        "Grow lights ON: natural light {light:.0} below target {:.0}",
                        self.target_light
                    ),
                );
            }
            self.on_ticks += 1;
            world.adjust_light((self.target_light - light) * SUPPLEMENT_GAIN);
        } else if self.lights_on {
            self.lights_on = false;
            ctx.events.info(
                Category::Lighting,
                format!("Grow lights OFF: natural light {light:.0} sufficient"),
            );
        }
        Ok(())
    }

    fn status_summary(&self) -> String {
        format!(
            "Lighting [{}] | Lights: {} | Level: {:.0}/{:.0} | Activations: {} | On-ticks: {}",
            on_off(self.enabled),
            on_off(self.lights_on),
            self.observed_light,
            self.target_light,
            self.activations,
            self.on_ticks
        )
    }

    fn state(&self) -> ModuleState {
        ModuleState::Lighting {
            enabled: self.enabled,
            lights_on: self.lights_on,
            observed_light: self.observed_light,
            target_light: self.target_light,
            activations: self.activations,
            on_ticks: self.on_ticks,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
