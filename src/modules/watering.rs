use std::any::Any;

use anyhow::{ensure, Result};
use serde::Serialize;

use super::{on_off, ControlModule, ModuleContext, ModuleState};
use crate::{
    events::{Category, Emitter},
    geometry::Position,
    rng::StreamRng,
    sensor::SensorKind,
    world::World,
};

/// An active zone keeps running until every covered plant reaches this level.
pub const ZONE_SATURATION_LEVEL: f64 = 75.0;
pub const NUTRIENTS_PER_WATERING: f64 = 2.0;
/// Extra reach of a zone when looking for moisture sensors.
const SENSOR_REACH_MARGIN: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sprinkler {
    pub id: u32,
    pub position: Position,
    pub radius: f64,
    pub flow_rate: f64,
    pub active: bool,
}

impl Sprinkler {
    fn covers(&self, position: Position) -> bool {
        position.within(self.position, self.radius)
    }
}

/// Zoned irrigation with hysteresis: each sprinkler switches on below the
/// low threshold and stays on until its zone is back above the high one.
pub struct WateringSystem {
    enabled: bool,
    sprinklers: Vec<Sprinkler>,
    low_threshold: f64,
    high_threshold: f64,
    watering_events: u64,
    next_sprinkler: u32,
}

impl WateringSystem {
    pub fn new() -> Self {
        Self {
            enabled: true,
            sprinklers: Vec::new(),
            low_threshold: 25.0,
            high_threshold: 65.0,
            watering_events: 0,
            next_sprinkler: 1,
        }
    }

    pub fn add_sprinkler(&mut self, position: Position, radius: f64, flow_rate: f64) -> Result<u32> {
        ensure!(
            radius.is_finite() && radius >= 0.0,
            "sprinkler radius must be a non-negative number, got {radius}"
        );
        ensure!(
            flow_rate.is_finite() && flow_rate >= 0.0,
            "sprinkler flow rate must be a non-negative number, got {flow_rate}"
        );
        let id = self.next_sprinkler;
        self.next_sprinkler += 1;
        self.sprinklers.push(Sprinkler {
            id,
            position,
            radius,
            flow_rate,
            active: false,
        });
        Ok(id)
    }

    pub fn with_sprinkler(mut self, position: Position, radius: f64, flow_rate: f64) -> Result<Self> {
        self.add_sprinkler(position, radius, flow_rate)?;
        Ok(self)
    }

    pub fn sprinklers(&self) -> &[Sprinkler] {
        &self.sprinklers
    }

    pub fn watering_events(&self) -> u64 {
        self.watering_events
    }

    pub fn thresholds(&self) -> (f64, f64) {
        (self.low_threshold, self.high_threshold)
    }

    pub fn set_thresholds(&mut self, low: f64, high: f64) -> Result<()> {
        ensure!(
            low.is_finite() && high.is_finite() && low <= high,
            "moisture thresholds must satisfy low <= high, got {low} and {high}"
        );
        self.low_threshold = low;
        self.high_threshold = high;
        Ok(())
    }

    fn zone_needs_water(&self, sprinkler: &Sprinkler, world: &World) -> bool {
        let threshold = if sprinkler.active {
            self.high_threshold
        } else {
            self.low_threshold
        };
        let sensor_reach = sprinkler.radius + SENSOR_REACH_MARGIN;
        let sensor_dry = world
            .sensors()
            .of_kind(SensorKind::Moisture)
            .any(|s| s.position().within(sprinkler.position, sensor_reach) && s.reading() < threshold);
        if sensor_dry {
            return true;
        }

        let mut covered = world
            .plants()
            .iter()
            .filter(|p| p.is_alive() && sprinkler.covers(p.position()))
            .peekable();
        if covered.peek().is_none() {
            return false;
        }
        let cutoff = if sprinkler.active {
            ZONE_SATURATION_LEVEL
        } else {
            self.low_threshold
        };
        covered.any(|p| p.water_level() < cutoff)
    }

    /// Returns how many plants were irrigated.
    fn irrigate(sprinkler: &Sprinkler, world: &mut World, events: &Emitter<'_>) -> usize {
        let mut watered = 0;
        for plant in world.plants_mut() {
            if plant.is_alive() && sprinkler.covers(plant.position()) {
                plant.water(sprinkler.flow_rate, true, events);
                plant.add_nutrients(NUTRIENTS_PER_WATERING);
                watered += 1;
            }
        }
        watered
    }

    /// Forces every zone on and irrigates immediately.
    pub fn manual_water(&mut self, world: &mut World, events: &Emitter<'_>) -> usize {
        events.info(Category::UserAction, "Manual override: activating all zones");
        let mut watered = 0;
        for sprinkler in &mut self.sprinklers {
            sprinkler.active = true;
            self.watering_events += 1;
            watered += Self::irrigate(sprinkler, world, events);
        }
        events.info(
            Category::Watering,
            format!(
                "Manual watering complete: {} sprinklers activated, {watered} plant waterings",
                self.sprinklers.len()
            ),
        );
        watered
    }
}

impl Default for WateringSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlModule for WateringSystem {
    fn name(&self) -> &'static str {
        "watering"
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
        for index in 0..self.sprinklers.len() {
            let needs_water = self.zone_needs_water(&self.sprinklers[index], world);
            let sprinkler = &mut self.sprinklers[index];
            if needs_water {
                if !sprinkler.active {
                    sprinkler.active = true;
                    self.watering_events += 1;
                    ctx.events.info(
                        Category::Watering,
                        format!("Zone SPR-{} activated at {}", sprinkler.id, sprinkler.position),
                    );
                }
                Self::irrigate(sprinkler, world, &ctx.events);
            } else if sprinkler.active {
                sprinkler.active = false;
                ctx.events.info(
                    Category::Watering,
                    format!("Zone SPR-{} deactivated", sprinkler.id),
                );
            }
        }
        Ok(())
    }

    fn status_summary(&self) -> String {
        let active = self.sprinklers.iter().filter(|s| s.active).count();
        format!(
            "Watering System [{}] | Sprinklers: {active}/{} active | Events: {}",
            on_off(self.enabled),
            self.sprinklers.len(),
            self.watering_events
        )
    }

    fn state(&self) -> ModuleState {
        ModuleState::Watering {
            enabled: self.enabled,
            low_threshold: self.low_threshold,
            high_threshold: self.high_threshold,
            watering_events: self.watering_events,
            sprinklers: self.sprinklers.clone(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
