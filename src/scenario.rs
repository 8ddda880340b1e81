use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    engine::{Engine, EngineBuilder, EngineSettings},
    events::EventSink,
    geometry::Position,
    modules::{
        ControlModule, HeatingMode, HeatingSystem, LightingSystem, PestControl, PestControlMethod,
        WateringSystem,
    },
    plant::Plant,
    sensor::SensorKind,
    species::{InsectKind, PlantKind},
    world::World,
};

const IRRIGATION_LANES: [i32; 3] = [4, 10, 16];
const STANDARD_SPRINKLER_RADIUS: f64 = 7.5;
const STANDARD_SPRINKLER_FLOW: f64 = 8.0;

fn default_seed() -> u64 {
    42
}

fn default_rows() -> i32 {
    20
}

fn default_cols() -> i32 {
    20
}

fn default_true() -> bool {
    true
}

fn default_hunt_radius() -> f64 {
    2.0
}

fn default_kill_chance() -> f64 {
    0.3
}

fn default_status_interval() -> u64 {
    50
}

fn default_cleanup_interval() -> u64 {
    200
}

fn default_low_threshold() -> f64 {
    25.0
}

fn default_high_threshold() -> f64 {
    65.0
}

fn default_target_temperature() -> f64 {
    65.0
}

fn default_adjust_rate() -> f64 {
    2.0
}

fn default_target_light() -> f64 {
    60.0
}

fn default_pest_threshold() -> usize {
    1
}

fn default_check_interval() -> u32 {
    5
}

fn default_heating_mode() -> HeatingMode {
    HeatingMode::Auto
}

fn default_pest_method() -> PestControlMethod {
    PestControlMethod::Targeted
}

fn default_sprinkler_radius() -> f64 {
    STANDARD_SPRINKLER_RADIUS
}

fn default_sprinkler_flow() -> f64 {
    STANDARD_SPRINKLER_FLOW
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Irrigation lanes, monitoring stations, planting beds and a starter
    /// insect population on a 20x20 plot.
    #[default]
    Standard,
    Empty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_rows")]
    pub rows: i32,
    #[serde(default = "default_cols")]
    pub cols: i32,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default = "default_true")]
    pub spawning: bool,
    #[serde(default)]
    pub ecology: EcologySettings,
    #[serde(default)]
    pub plants: Vec<ScenarioPlant>,
    #[serde(default)]
    pub insects: Vec<ScenarioInsect>,
    #[serde(default)]
    pub sensors: Vec<ScenarioSensor>,
    #[serde(default)]
    pub sprinklers: Vec<ScenarioSprinkler>,
    #[serde(default)]
    pub modules: ModuleSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EcologySettings {
    #[serde(default = "default_hunt_radius")]
    pub hunt_radius: f64,
    #[serde(default = "default_kill_chance")]
    pub kill_chance: f64,
    #[serde(default = "default_status_interval")]
    pub status_interval_ticks: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_ticks: u64,
}

impl Default for EcologySettings {
    fn default() -> Self {
        Self {
            hunt_radius: default_hunt_radius(),
            kill_chance: default_kill_chance(),
            status_interval_ticks: default_status_interval(),
            cleanup_interval_ticks: default_cleanup_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioPlant {
    pub kind: PlantKind,
    pub row: i32,
    pub col: i32,
    pub water: Option<f64>,
    pub nutrients: Option<f64>,
    pub health: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioInsect {
    pub kind: InsectKind,
    pub row: i32,
    pub col: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSensor {
    pub kind: SensorKind,
    pub row: i32,
    pub col: i32,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSprinkler {
    pub row: i32,
    pub col: i32,
    #[serde(default = "default_sprinkler_radius")]
    pub radius: f64,
    #[serde(default = "default_sprinkler_flow")]
    pub flow_rate: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleSettings {
    #[serde(default)]
    pub watering: WateringSettings,
    #[serde(default)]
    pub heating: HeatingSettings,
    #[serde(default)]
    pub lighting: LightingSettings,
    #[serde(default)]
    pub pest_control: PestControlSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WateringSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,
}

impl Default for WateringSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            low_threshold: default_low_threshold(),
            high_threshold: default_high_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeatingSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_heating_mode")]
    pub mode: HeatingMode,
    #[serde(default = "default_target_temperature")]
    pub target_temperature: f64,
    #[serde(default = "default_adjust_rate")]
    pub adjust_rate: f64,
}

impl Default for HeatingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: default_heating_mode(),
            target_temperature: default_target_temperature(),
            adjust_rate: default_adjust_rate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightingSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_target_light")]
    pub target_light: f64,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            target_light: default_target_light(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PestControlSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_pest_method")]
    pub method: PestControlMethod,
    #[serde(default = "default_pest_threshold")]
    pub threshold: usize,
    #[serde(default = "default_check_interval")]
    pub check_interval: u32,
}

impl Default for PestControlSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            method: default_pest_method(),
            threshold: default_pest_threshold(),
            check_interval: default_check_interval(),
        }
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    /// The default 20x20 garden with every controller at its defaults.
    pub fn standard() -> Self {
        Self {
            name: "Smart Garden".to_string(),
            description: None,
            seed: default_seed(),
            rows: default_rows(),
            cols: default_cols(),
            layout: Layout::Standard,
            ticks: None,
            spawning: true,
            ecology: EcologySettings::default(),
            plants: Vec::new(),
            insects: Vec::new(),
            sensors: Vec::new(),
            sprinklers: Vec::new(),
            modules: ModuleSettings::default(),
        }
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(1_000)
    }

    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            seed: self.seed,
            status_interval_ticks: self.ecology.status_interval_ticks,
            cleanup_interval_ticks: self.ecology.cleanup_interval_ticks,
            hunt_radius: self.ecology.hunt_radius,
            kill_chance: self.ecology.kill_chance,
            spawning: self.spawning,
        }
    }

    pub fn build_engine(&self, sink: Arc<dyn EventSink>) -> Result<Engine> {
        let world = World::new(self.name.clone(), self.rows, self.cols)
            .with_context(|| format!("Invalid grid for scenario '{}'", self.name))?;

        let mut watering = WateringSystem::new();
        let m = &self.modules;
        watering.set_thresholds(m.watering.low_threshold, m.watering.high_threshold)?;
        watering.set_enabled(m.watering.enabled);
        if self.layout == Layout::Standard {
            for position in standard_sprinklers(self.rows) {
                world.check_bounds(position)?;
                watering.add_sprinkler(position, STANDARD_SPRINKLER_RADIUS, STANDARD_SPRINKLER_FLOW)?;
            }
        }
        for s in &self.sprinklers {
            let position = Position::new(s.row, s.col);
            world.check_bounds(position)?;
            watering.add_sprinkler(position, s.radius, s.flow_rate)?;
        }

        let mut heating = HeatingSystem::new();
        heating.set_mode(m.heating.mode);
        heating.set_target_temperature(m.heating.target_temperature)?;
        heating.set_adjust_rate(m.heating.adjust_rate)?;
        heating.set_enabled(m.heating.enabled);

        let mut pest_control = PestControl::new().with_method(m.pest_control.method);
        pest_control.set_threshold(m.pest_control.threshold);
        pest_control.set_check_interval(m.pest_control.check_interval)?;
        pest_control.set_enabled(m.pest_control.enabled);

        let mut lighting = LightingSystem::new();
        lighting.set_target_light(m.lighting.target_light)?;
        lighting.set_enabled(m.lighting.enabled);

        let mut engine = EngineBuilder::new(world, self.settings())
            .with_sink(sink)
            .with_module(watering)
            .with_module(heating)
            .with_module(pest_control)
            .with_module(lighting)
            .build();

        if self.layout == Layout::Standard {
            seed_standard_garden(&mut engine, self.rows, self.cols)
                .with_context(|| format!("Standard layout does not fit a {}x{} grid", self.rows, self.cols))?;
        }

        for s in &self.sensors {
            let id = engine.add_sensor(s.kind, Position::new(s.row, s.col))?;
            if s.min.is_some() || s.max.is_some() {
                let sensor = engine
                    .world_mut()
                    .sensors_mut()
                    .get_mut(id)
                    .context("Sensor vanished after insertion")?;
                let (min, max) = sensor.thresholds();
                sensor.set_thresholds(s.min.unwrap_or(min), s.max.unwrap_or(max))?;
            }
        }
        for p in &self.plants {
            let id = engine.world_mut().next_entity_id();
            let mut plant = Plant::new(id, p.kind, Position::new(p.row, p.col));
            if let Some(water) = p.water {
                plant = plant.with_water(water);
            }
            if let Some(nutrients) = p.nutrients {
                plant = plant.with_nutrients(nutrients);
            }
            if let Some(health) = p.health {
                plant = plant.with_health(health);
            }
            engine.insert_plant(plant)?;
        }
        for i in &self.insects {
            engine.add_insect(i.kind, Position::new(i.row, i.col))?;
        }

        tracing::info!(
            scenario = %self.name,
            plants = engine.world().plants().len(),
            insects = engine.world().insects().len(),
            sensors = engine.world().sensors().len(),
            "scenario loaded"
        );
        Ok(engine)
    }
}

fn standard_sprinklers(rows: i32) -> Vec<Position> {
    IRRIGATION_LANES
        .iter()
        .flat_map(|&col| (3..rows).step_by(6).map(move |row| Position::new(row, col)))
        .collect()
}

fn is_lane(col: i32) -> bool {
    IRRIGATION_LANES.contains(&col)
}

fn bed_columns(start: i32, end: i32, step: usize) -> impl Iterator<Item = i32> {
    (start..end).step_by(step).filter(|&c| !is_lane(c))
}

fn seed_standard_garden(engine: &mut Engine, rows: i32, cols: i32) -> Result<()> {
    // A moisture probe sits one row below every sprinkler.
    for sprinkler in standard_sprinklers(rows) {
        engine.add_sensor(
            SensorKind::Moisture,
            Position::new(sprinkler.row + 1, sprinkler.col),
        )?;
    }
    engine.add_sensor(SensorKind::Temperature, Position::new(0, 0))?;
    engine.add_sensor(SensorKind::Temperature, Position::new(rows - 1, cols - 1))?;
    engine.add_sensor(SensorKind::Temperature, Position::new(rows / 2, cols / 2))?;
    engine.add_sensor(SensorKind::Light, Position::new(0, cols / 2))?;
    engine.add_sensor(SensorKind::Light, Position::new(rows - 1, 0))?;

    for c in bed_columns(1, cols - 1, 3) {
        engine.add_plant(PlantKind::Tomato, Position::new(1, c))?;
        engine.add_plant(PlantKind::Tomato, Position::new(2, c))?;
    }
    for c in bed_columns(1, cols - 1, 3) {
        engine.add_plant(PlantKind::Rose, Position::new(5, c))?;
        engine.add_plant(PlantKind::Rose, Position::new(6, c))?;
    }
    for c in bed_columns(2, cols - 1, 4) {
        engine.add_plant(PlantKind::Sunflower, Position::new(9, c))?;
    }
    for c in bed_columns(1, cols - 1, 2) {
        engine.add_plant(PlantKind::Carrot, Position::new(13, c))?;
        engine.add_plant(PlantKind::Lettuce, Position::new(14, c))?;
    }
    for c in bed_columns(1, cols, 5) {
        engine.add_plant(PlantKind::Cactus, Position::new(18, c))?;
    }

    let starters = [
        (InsectKind::Bee, 4, 4),
        (InsectKind::Bee, 8, 8),
        (InsectKind::Bee, 6, 16),
        (InsectKind::Ladybug, 6, 6),
        (InsectKind::Aphid, 3, 5),
        (InsectKind::Caterpillar, 11, 3),
    ];
    for (kind, row, col) in starters {
        engine.add_insect(kind, Position::new(row, col))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_lanes_match_plot_height() {
        let sprinklers = standard_sprinklers(20);
        assert_eq!(sprinklers.len(), 9);
        assert!(sprinklers.contains(&Position::new(15, 16)));
        assert!(!sprinklers.iter().any(|p| p.row >= 20));
    }

    #[test]
    fn beds_skip_irrigation_lanes() {
        let tomato: Vec<i32> = bed_columns(1, 19, 3).collect();
        assert_eq!(tomato, vec![1, 7, 13]);
        let carrots: Vec<i32> = bed_columns(1, 19, 2).collect();
        assert!(!carrots.iter().any(|c| is_lane(*c)));
        assert_eq!(carrots.len(), 9);
    }
}
