use std::any::Any;
use std::fmt;

use anyhow::{ensure, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{on_off, ControlModule, ModuleContext, ModuleState};
use crate::{
    events::{Category, Emitter},
    rng::{RngExt, StreamRng},
    world::World,
};

pub const ORGANIC_KILL_CHANCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PestControlMethod {
    /// Each pest dies with probability [`ORGANIC_KILL_CHANCE`].
    Organic,
    /// Every living insect dies, beneficials included.
    Chemical,
    /// Every pest dies; other insects are untouched.
    Targeted,
}

impl fmt::Display for PestControlMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PestControlMethod::Organic => "ORGANIC",
            PestControlMethod::Chemical => "CHEMICAL",
            PestControlMethod::Targeted => "TARGETED",
        })
    }
}

pub struct PestControl {
    enabled: bool,
    method: PestControlMethod,
    threshold: usize,
    check_interval: u32,
    ticks_since_check: u32,
    activations: u64,
    eliminated: u64,
    last_activation_tick: Option<u64>,
}

impl PestControl {
    pub fn new() -> Self {
        Self {
            enabled: true,
            method: PestControlMethod::Targeted,
            threshold: 1,
            check_interval: 5,
            ticks_since_check: 0,
            activations: 0,
            eliminated: 0,
            last_activation_tick: None,
        }
    }

    pub fn with_method(mut self, method: PestControlMethod) -> Self {
        self.method = method;
        self
    }

    pub fn method(&self) -> PestControlMethod {
        self.method
    }

    pub fn set_method(&mut self, method: PestControlMethod) {
        self.method = method;
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Minimum number of living pests that triggers a treatment.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
    }

    pub fn check_interval(&self) -> u32 {
        self.check_interval
    }

    pub fn set_check_interval(&mut self, interval: u32) -> Result<()> {
        ensure!(interval >= 1, "pest check interval must be at least one tick");
        self.check_interval = interval;
        Ok(())
    }

    pub fn activations(&self) -> u64 {
        self.activations
    }

    pub fn eliminated(&self) -> u64 {
        self.eliminated
    }

    pub fn last_activation_tick(&self) -> Option<u64> {
        self.last_activation_tick
    }

    /// Treats the garden with the configured method. Returns the number of
    /// insects killed.
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        tick: u64,
        world: &mut World,
        rng: &mut R,
        events: &Emitter<'_>,
    ) -> usize {
        let pests = world.alive_pest_count();
        self.activations += 1;
        self.last_activation_tick = Some(tick);
        events.info(
            Category::PestControl,
            format!("Activating {} pest control! {pests} pests detected", self.method),
        );

        let method = self.method;
        let mut killed = 0;
        for insect in world.insects_mut() {
            if !insect.is_alive() {
                continue;
            }
            let dies = match method {
                PestControlMethod::Chemical => true,
                PestControlMethod::Targeted => insect.is_pest(),
                PestControlMethod::Organic => insect.is_pest() && rng.chance(ORGANIC_KILL_CHANCE),
            };
            if dies {
                let reason = format!("{} pest control", method);
                insect.kill(&reason, events);
                killed += 1;
            }
        }
        self.eliminated += killed as u64;

        match method {
            PestControlMethod::Chemical => events.warn(
                Category::PestControl,
                format!("Chemical method: all {killed} insects eliminated, beneficials included"),
            ),
            PestControlMethod::Targeted => events.info(
                Category::PestControl,
                format!("Targeted method: {killed} pests eliminated. Beneficials safe"),
            ),
            PestControlMethod::Organic => events.info(
                Category::PestControl,
                format!("Organic method: {killed}/{pests} pests eliminated"),
            ),
        }
        killed
    }

    /// Treats immediately when any pest is alive, regardless of threshold
    /// or check cadence.
    pub fn manual_pest_control<R: Rng + ?Sized>(
        &mut self,
        tick: u64,
        world: &mut World,
        rng: &mut R,
        events: &Emitter<'_>,
    ) -> usize {
        events.info(Category::UserAction, "Manual pest control triggered");
        if world.alive_pest_count() == 0 {
            events.info(Category::PestControl, "No pests found to eliminate");
            return 0;
        }
        self.apply(tick, world, rng, events)
    }
}

impl Default for PestControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlModule for PestControl {
    fn name(&self) -> &'static str {
        "pest_control"
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
        rng: &mut StreamRng,
    ) -> Result<()> {
        self.ticks_since_check += 1;
        if self.ticks_since_check < self.check_interval {
            return Ok(());
        }
        self.ticks_since_check = 0;
        if world.alive_pest_count() >= self.threshold {
            self.apply(ctx.tick, world, rng, &ctx.events);
        }
        Ok(())
    }

    fn status_summary(&self) -> String {
        format!(
            "Pest Control [{}] | Method: {} | Activations: {} | Eliminated: {}",
            on_off(self.enabled),
            self.method,
            self.activations,
            self.eliminated
        )
    }

    fn state(&self) -> ModuleState {
        ModuleState::PestControl {
            enabled: self.enabled,
            method: self.method,
            threshold: self.threshold,
            check_interval: self.check_interval,
            activations: self.activations,
            eliminated: self.eliminated,
            last_activation_tick: self.last_activation_tick,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
