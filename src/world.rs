use std::fmt;

use serde::{Deserialize, Serialize};

use crate::environment::{Conditions, EnvironmentModel};
use crate::error::{GardenError, Result};
use crate::geometry::{GridBounds, Position};
use crate::insect::Insect;
use crate::plant::Plant;
use crate::sensor::{Sensor, SensorKind, SensorNetwork};
use crate::species::{InsectKind, PlantKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything that lives on the grid plus the current environment.
///
/// Control modules and tests mutate it directly; the [`Engine`] owns one and
/// checkpoints it around failure-prone stages.
///
/// [`Engine`]: crate::engine::Engine
#[derive(Debug, Clone)]
pub struct World {
    name: String,
    bounds: GridBounds,
    next_entity: u64,
    tick: u64,
    pub(crate) conditions: Conditions,
    pub(crate) environment: EnvironmentModel,
    pub(crate) plants: Vec<Plant>,
    pub(crate) insects: Vec<Insect>,
    pub(crate) sensors: SensorNetwork,
}

impl World {
    pub fn new(name: impl Into<String>, rows: i32, cols: i32) -> Result<Self> {
        if rows < 1 || cols < 1 {
            return Err(GardenError::InvalidConfig(format!(
                "grid must be at least 1x1, got {rows}x{cols}"
            )));
        }
        Ok(Self {
            name: name.into(),
            bounds: GridBounds::new(rows, cols),
            next_entity: 1,
            tick: 0,
            conditions: Conditions::default(),
            environment: EnvironmentModel::new(),
            plants: Vec::new(),
            insects: Vec::new(),
            sensors: SensorNetwork::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn advance_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn conditions(&self) -> Conditions {
        self.conditions
    }

    /// Overrides the current environment until the next environment stage.
    pub fn set_conditions(&mut self, conditions: Conditions) {
        self.conditions = conditions;
    }

    pub fn environment(&self) -> &EnvironmentModel {
        &self.environment
    }

    pub fn adjust_temperature(&mut self, delta: f64) {
        self.conditions.temperature += delta;
    }

    pub fn adjust_light(&mut self, delta: f64) {
        self.conditions.light = (self.conditions.light + delta).clamp(0.0, 100.0);
    }

    pub fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    pub fn check_bounds(&self, position: Position) -> Result<()> {
        if self.bounds.contains(position) {
            Ok(())
        } else {
            Err(GardenError::OutOfBounds {
                position,
                bounds: self.bounds,
            })
        }
    }

    pub fn insert_plant(&mut self, plant: Plant) -> Result<EntityId> {
        self.check_bounds(plant.position())?;
        let id = plant.id();
        self.plants.push(plant);
        Ok(id)
    }

    pub fn insert_insect(&mut self, insect: Insect) -> Result<EntityId> {
        self.check_bounds(insect.position())?;
        let id = insect.id();
        self.insects.push(insect);
        Ok(id)
    }

    pub fn insert_sensor(&mut self, sensor: Sensor) -> Result<EntityId> {
        self.check_bounds(sensor.position())?;
        let id = sensor.id();
        self.sensors.push(sensor);
        Ok(id)
    }

    pub fn add_plant(&mut self, kind: PlantKind, position: Position) -> Result<EntityId> {
        self.check_bounds(position)?;
        let id = self.next_entity_id();
        self.insert_plant(Plant::new(id, kind, position))
    }

    pub fn add_insect(&mut self, kind: InsectKind, position: Position) -> Result<EntityId> {
        self.check_bounds(position)?;
        let id = self.next_entity_id();
        self.insert_insect(Insect::new(id, kind, position))
    }

    pub fn add_sensor(&mut self, kind: SensorKind, position: Position) -> Result<EntityId> {
        self.check_bounds(position)?;
        let id = self.next_entity_id();
        self.insert_sensor(Sensor::new(id, kind, position))
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    pub fn plants_mut(&mut self) -> &mut [Plant] {
        &mut self.plants
    }

    pub fn plant(&self, id: EntityId) -> Option<&Plant> {
        self.plants.iter().find(|p| p.id() == id)
    }

    pub fn plant_mut(&mut self, id: EntityId) -> Option<&mut Plant> {
        self.plants.iter_mut().find(|p| p.id() == id)
    }

    pub fn insects(&self) -> &[Insect] {
        &self.insects
    }

    pub fn insects_mut(&mut self) -> &mut [Insect] {
        &mut self.insects
    }

    pub fn insect(&self, id: EntityId) -> Option<&Insect> {
        self.insects.iter().find(|i| i.id() == id)
    }

    pub fn sensors(&self) -> &SensorNetwork {
        &self.sensors
    }

    pub fn sensors_mut(&mut self) -> &mut SensorNetwork {
        &mut self.sensors
    }

    pub fn alive_plant_count(&self) -> usize {
        self.plants.iter().filter(|p| p.is_alive()).count()
    }

    pub fn alive_insect_count(&self) -> usize {
        self.insects.iter().filter(|i| i.is_alive()).count()
    }

    pub fn alive_pest_count(&self) -> usize {
        self.insects
            .iter()
            .filter(|i| i.is_alive() && i.is_pest())
            .count()
    }

    /// Drops dead insects. Dead plants stay on the grid.
    pub fn remove_dead_insects(&mut self) -> usize {
        let before = self.insects.len();
        self.insects.retain(Insect::is_alive);
        before - self.insects.len()
    }
}
