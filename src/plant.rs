use std::fmt;

use serde::{Deserialize, Serialize};

use crate::environment::{Conditions, DAY_CYCLE_TICKS};
use crate::error::{ensure_finite, Result};
use crate::events::{Category, Emitter};
use crate::geometry::Position;
use crate::species::{PlantKind, PlantSpecies};
use crate::world::EntityId;

const LEVEL_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrowthStage {
    Seed,
    Sprout,
    Vegetative,
    Flowering,
    Fruiting,
    Mature,
    Wilting,
    Dead,
}

impl GrowthStage {
    /// Next stage on the main sequence; `None` past `Mature` and for the
    /// terminal stages.
    pub fn next(self) -> Option<GrowthStage> {
        match self {
            GrowthStage::Seed => Some(GrowthStage::Sprout),
            GrowthStage::Sprout => Some(GrowthStage::Vegetative),
            GrowthStage::Vegetative => Some(GrowthStage::Flowering),
            GrowthStage::Flowering => Some(GrowthStage::Fruiting),
            GrowthStage::Fruiting => Some(GrowthStage::Mature),
            GrowthStage::Mature | GrowthStage::Wilting | GrowthStage::Dead => None,
        }
    }
}

impl fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GrowthStage::Seed => "SEED",
            GrowthStage::Sprout => "SPROUT",
            GrowthStage::Vegetative => "VEGETATIVE",
            GrowthStage::Flowering => "FLOWERING",
            GrowthStage::Fruiting => "FRUITING",
            GrowthStage::Mature => "MATURE",
            GrowthStage::Wilting => "WILTING",
            GrowthStage::Dead => "DEAD",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plant {
    id: EntityId,
    kind: PlantKind,
    position: Position,
    health: f64,
    water: f64,
    nutrients: f64,
    stage: GrowthStage,
    age_ticks: u32,
    alive: bool,
    #[serde(skip)]
    light_accumulator: f64,
    #[serde(skip)]
    light_ticks: u64,
    light_satisfaction: f64,
}

impl Plant {
    pub fn new(id: EntityId, kind: PlantKind, position: Position) -> Self {
        Self {
            id,
            kind,
            position,
            health: 100.0,
            water: 50.0,
            nutrients: 50.0,
            stage: GrowthStage::Seed,
            age_ticks: 0,
            alive: true,
            light_accumulator: 0.0,
            light_ticks: 0,
            light_satisfaction: 1.0,
        }
    }

    pub fn with_health(mut self, health: f64) -> Self {
        self.health = health.clamp(0.0, LEVEL_MAX);
        self
    }

    pub fn with_water(mut self, water: f64) -> Self {
        self.water = water.clamp(0.0, LEVEL_MAX);
        self
    }

    pub fn with_nutrients(mut self, nutrients: f64) -> Self {
        self.nutrients = nutrients.clamp(0.0, LEVEL_MAX);
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> PlantKind {
        self.kind
    }

    pub fn species(&self) -> &'static PlantSpecies {
        self.kind.species()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn water_level(&self) -> f64 {
        self.water
    }

    pub fn nutrient_level(&self) -> f64 {
        self.nutrients
    }

    pub fn stage(&self) -> GrowthStage {
        self.stage
    }

    pub fn age_ticks(&self) -> u32 {
        self.age_ticks
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn light_satisfaction(&self) -> f64 {
        self.light_satisfaction
    }

    pub fn label(&self) -> String {
        format!("{} [{}]", self.kind, self.id)
    }

    pub fn update(&mut self, conditions: &Conditions, events: &Emitter<'_>) -> Result<()> {
        if !self.alive {
            return Ok(());
        }
        let temperature = ensure_finite("temperature", conditions.temperature)?;
        let light = ensure_finite("light", conditions.light)?;
        let humidity = ensure_finite("humidity", conditions.humidity)?;
        let species = self.species();

        self.age_ticks += 1;
        self.water = (self.water - species.water_need_per_tick).max(0.0);
        self.nutrients = (self.nutrients - species.nutrient_need_per_tick).max(0.0);

        if self.water <= 0.0 {
            events.warn(
                Category::Plant,
                format!("{} is critically dehydrated!", self.label()),
            );
        }

        self.accumulate_light(light, events);

        let delta = water_effect(self.water)
            + temperature_effect(species, temperature)
            + nutrient_effect(self.nutrients)
            + light_effect(self.light_satisfaction)
            + humidity_effect(humidity);

        if humidity > 90.0 && self.age_ticks % 100 == 0 {
            events.warn(
                Category::Plant,
                format!(
                    "{} at risk of fungal disease (humidity: {humidity:.0}%)",
                    self.label()
                ),
            );
        }

        self.health = (self.health + delta).clamp(0.0, LEVEL_MAX);
        if self.health <= 0.0 {
            self.die("Health reached zero", events);
            return Ok(());
        }

        if self.age_ticks % species.ticks_per_stage == 0 && self.health > 30.0 {
            self.advance_stage(events);
        }

        if self.health < 20.0 && self.stage != GrowthStage::Wilting {
            self.stage = GrowthStage::Wilting;
            events.warn(
                Category::Plant,
                format!("{} is wilting! Health: {:.1}%", self.label(), self.health),
            );
        }
        Ok(())
    }

    // Daily light integral: satisfaction is re-evaluated once per day cycle
    // and applied every tick in between.
    fn accumulate_light(&mut self, light: f64, events: &Emitter<'_>) {
        self.light_accumulator += light;
        self.light_ticks += 1;
        if self.light_ticks < DAY_CYCLE_TICKS {
            return;
        }
        let need = self.species().light_need_hours;
        let average = self.light_accumulator / DAY_CYCLE_TICKS as f64;
        let hours = average / 100.0 * 24.0;
        self.light_satisfaction = (hours / need).min(2.0);
        if self.light_satisfaction < 0.5 {
            events.warn(
                Category::Plant,
                format!(
                    "{} severe light deficit: received {hours:.1}h, needs {need:.0}h",
                    self.label()
                ),
            );
        }
        self.light_accumulator = 0.0;
        self.light_ticks = 0;
    }

    fn advance_stage(&mut self, events: &Emitter<'_>) {
        if let Some(next) = self.stage.next() {
            let previous = self.stage;
            self.stage = next;
            events.info(
                Category::Plant,
                format!(
                    "{} grew from {previous} to {next} (health: {:.1}%)",
                    self.label(),
                    self.health
                ),
            );
        }
    }

    fn die(&mut self, reason: &str, events: &Emitter<'_>) {
        self.alive = false;
        self.stage = GrowthStage::Dead;
        events.warn(
            Category::Plant,
            format!("{} DIED. Reason: {reason}", self.label()),
        );
    }

    /// Adds water. Automated irrigation passes `silent` to avoid flooding
    /// the journal with one entry per plant per tick.
    pub fn water(&mut self, amount: f64, silent: bool, events: &Emitter<'_>) {
        if !self.alive {
            return;
        }
        let before = self.water;
        self.water = (self.water + amount).clamp(0.0, LEVEL_MAX);
        if !silent {
            events.info(
                Category::Plant,
                format!("{} watered: {before:.1} -> {:.1}", self.label(), self.water),
            );
        }
    }

    pub fn fertilize(&mut self, amount: f64, events: &Emitter<'_>) {
        if !self.alive {
            return;
        }
        let before = self.nutrients;
        self.add_nutrients(amount);
        events.info(
            Category::Plant,
            format!(
                "{} fertilized: {before:.1} -> {:.1}",
                self.label(),
                self.nutrients
            ),
        );
    }

    pub fn add_nutrients(&mut self, amount: f64) {
        if !self.alive {
            return;
        }
        self.nutrients = (self.nutrients + amount).clamp(0.0, LEVEL_MAX);
    }

    pub fn apply_pest_damage(&mut self, damage: f64, events: &Emitter<'_>) {
        if !self.alive {
            return;
        }
        let resistance = self.species().pest_resistance;
        let effective = damage * (1.0 - resistance);
        self.health = (self.health - effective).clamp(0.0, LEVEL_MAX);
        events.info(
            Category::Plant,
            format!(
                "{} took {effective:.1} pest damage (resistance: {:.0}%). Health: {:.1}%",
                self.label(),
                resistance * 100.0,
                self.health
            ),
        );
        if self.health <= 0.0 {
            self.die("Killed by pests", events);
        }
    }

    pub fn status_summary(&self) -> String {
        format!(
            "{} ({}) | Stage: {} | HP: {:.0}% | Water: {:.0}% | Nutrients: {:.0}%",
            self.kind,
            self.species().latin_name,
            self.stage,
            self.health,
            self.water,
            self.nutrients
        )
    }
}

fn water_effect(water: f64) -> f64 {
    if water < 10.0 {
        -2.5
    } else if water > 90.0 {
        -0.5
    } else if water > 40.0 && water < 70.0 {
        1.2
    } else {
        0.5
    }
}

fn temperature_effect(species: &PlantSpecies, temperature: f64) -> f64 {
    if temperature < species.ideal_temperature_min {
        -(species.ideal_temperature_min - temperature) * 0.35
    } else if temperature > species.ideal_temperature_max {
        -(temperature - species.ideal_temperature_max) * 0.35
    } else {
        0.6
    }
}

fn nutrient_effect(nutrients: f64) -> f64 {
    if nutrients < 10.0 {
        -1.5
    } else if nutrients > 40.0 {
        0.5
    } else {
        0.0
    }
}

fn light_effect(satisfaction: f64) -> f64 {
    if satisfaction < 0.7 {
        -(0.7 - satisfaction) * 1.5
    } else if satisfaction >= 0.9 {
        0.2
    } else {
        0.0
    }
}

fn humidity_effect(humidity: f64) -> f64 {
    if humidity > 85.0 {
        -0.8 * ((humidity - 85.0) / 15.0)
    } else if humidity < 30.0 {
        -0.6 * ((30.0 - humidity) / 30.0)
    } else if (40.0..=70.0).contains(&humidity) {
        0.15
    } else {
        0.0
    }
}
