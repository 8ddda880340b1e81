//! Immutable views of the garden for renderers and the web API.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::environment::{day_number, day_progress, is_daytime, Conditions};
use crate::insect::Insect;
use crate::modules::{ControlModule, ModuleState};
use crate::plant::Plant;
use crate::sensor::Sensor;
use crate::world::World;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub humidity_bias: f64,
    pub cloud_cover: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GardenStats {
    pub alive_plants: usize,
    pub total_plants: usize,
    pub alive_insects: usize,
    pub alive_pests: usize,
    pub sensor_alerts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GardenSnapshot {
    pub garden: String,
    pub tick: u64,
    pub day: u64,
    pub day_progress: f64,
    pub daytime: bool,
    pub rows: i32,
    pub cols: i32,
    pub conditions: Conditions,
    pub weather: WeatherSnapshot,
    pub stats: GardenStats,
    pub plants: Vec<Plant>,
    pub insects: Vec<Insect>,
    pub sensors: Vec<Sensor>,
    pub modules: Vec<ModuleState>,
}

impl GardenSnapshot {
    pub fn capture<'a>(
        world: &World,
        modules: impl Iterator<Item = &'a dyn ControlModule>,
    ) -> Self {
        let tick = world.tick();
        let bounds = world.bounds();
        let sensors: Vec<Sensor> = world.sensors().iter().cloned().collect();
        Self {
            garden: world.name().to_string(),
            tick,
            day: day_number(tick),
            day_progress: day_progress(tick),
            daytime: is_daytime(tick),
            rows: bounds.rows,
            cols: bounds.cols,
            conditions: world.conditions(),
            weather: WeatherSnapshot {
                humidity_bias: world.environment().humidity_bias(),
                cloud_cover: world.environment().cloud_cover(),
            },
            stats: GardenStats {
                alive_plants: world.alive_plant_count(),
                total_plants: world.plants().len(),
                alive_insects: world.alive_insect_count(),
                alive_pests: world.alive_pest_count(),
                sensor_alerts: world.sensors().alerts(),
            },
            plants: world.plants().to_vec(),
            insects: world.insects().to_vec(),
            sensors,
            modules: modules.map(|m| m.state()).collect(),
        }
    }
}

/// Latest published snapshot, swapped atomically so readers never observe a
/// half-updated garden.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    latest: RwLock<Option<Arc<GardenSnapshot>>>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: GardenSnapshot) -> Arc<GardenSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::clone(&snapshot));
        snapshot
    }

    pub fn latest(&self) -> Option<Arc<GardenSnapshot>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
