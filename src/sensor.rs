//! Sensor measurement with edge-triggered alerts.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::environment::Conditions;
use crate::error::{ensure_finite, GardenError, Result};
use crate::events::{Category, Emitter};
use crate::geometry::Position;
use crate::plant::Plant;
use crate::rng::RngExt;
use crate::world::EntityId;

/// Plants within this distance of a moisture probe contribute to its reading.
pub const MOISTURE_PROBE_RADIUS: f64 = 3.0;
/// Moisture reported when no living plant is in range.
pub const MOISTURE_FALLBACK: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Light,
    Moisture,
}

impl SensorKind {
    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Temperature => "Temperature Sensor",
            SensorKind::Light => "Light Sensor",
            SensorKind::Moisture => "Moisture Sensor",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            SensorKind::Temperature => "°F",
            SensorKind::Light => "lux",
            SensorKind::Moisture => "%",
        }
    }

    pub fn default_thresholds(self) -> (f64, f64) {
        match self {
            SensorKind::Temperature => (40.0, 95.0),
            SensorKind::Light => (20.0, 90.0),
            SensorKind::Moisture => (20.0, 80.0),
        }
    }

    /// Half-width of the uniform measurement noise.
    pub fn noise(self) -> f64 {
        match self {
            SensorKind::Temperature => 0.5,
            SensorKind::Light => 1.5,
            SensorKind::Moisture => 2.0,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sensor {
    id: EntityId,
    kind: SensorKind,
    position: Position,
    reading: f64,
    min_threshold: f64,
    max_threshold: f64,
    alert: bool,
}

impl Sensor {
    pub fn new(id: EntityId, kind: SensorKind, position: Position) -> Self {
        let (min_threshold, max_threshold) = kind.default_thresholds();
        Self {
            id,
            kind,
            position,
            reading: 0.0,
            min_threshold,
            max_threshold,
            alert: false,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn reading(&self) -> f64 {
        self.reading
    }

    pub fn thresholds(&self) -> (f64, f64) {
        (self.min_threshold, self.max_threshold)
    }

    pub fn is_alert(&self) -> bool {
        self.alert
    }

    pub fn label(&self) -> String {
        format!("{} [{}]", self.kind, self.id)
    }

    pub fn set_thresholds(&mut self, min: f64, max: f64) -> Result<()> {
        ensure_finite("minimum threshold", min)?;
        ensure_finite("maximum threshold", max)?;
        if min > max {
            return Err(GardenError::InvalidConfig(format!(
                "sensor threshold min {min} exceeds max {max}"
            )));
        }
        self.min_threshold = min;
        self.max_threshold = max;
        Ok(())
    }

    /// Value the sensor would read before noise.
    pub fn measure(&self, conditions: &Conditions, plants: &[Plant]) -> f64 {
        match self.kind {
            SensorKind::Temperature => conditions.temperature,
            SensorKind::Light => conditions.light,
            SensorKind::Moisture => {
                let (sum, count) = plants
                    .iter()
                    .filter(|p| p.is_alive() && p.position().within(self.position, MOISTURE_PROBE_RADIUS))
                    .fold((0.0, 0usize), |(sum, count), p| (sum + p.water_level(), count + 1));
                if count == 0 {
                    MOISTURE_FALLBACK
                } else {
                    sum / count as f64
                }
            }
        }
    }

    pub fn update<R: Rng + ?Sized>(
        &mut self,
        conditions: &Conditions,
        plants: &[Plant],
        rng: &mut R,
        events: &Emitter<'_>,
    ) -> Result<()> {
        let value = self.measure(conditions, plants) + rng.noise(self.kind.noise());
        self.record(value, events)
    }

    /// Stores a reading and reports alert transitions only.
    pub fn record(&mut self, reading: f64, events: &Emitter<'_>) -> Result<()> {
        self.reading = ensure_finite("sensor reading", reading)?;
        let was_alert = self.alert;
        self.alert = reading < self.min_threshold || reading > self.max_threshold;
        let unit = self.kind.unit();
        if self.alert && !was_alert {
            events.warn(
                Category::Sensor,
                format!(
                    "ALERT: {} at {} reading {reading:.1} {unit} (threshold: {:.1}-{:.1})",
                    self.label(),
                    self.position,
                    self.min_threshold,
                    self.max_threshold
                ),
            );
        } else if !self.alert && was_alert {
            events.info(
                Category::Sensor,
                format!("{} returned to normal: {reading:.1} {unit}", self.label()),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SensorNetwork {
    sensors: Vec<Sensor>,
}

impl SensorNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sensor: Sensor) {
        self.sensors.push(sensor);
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Sensor> {
        self.sensors.iter_mut()
    }

    pub fn get(&self, id: EntityId) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Sensor> {
        self.sensors.iter_mut().find(|s| s.id == id)
    }

    pub fn of_kind(&self, kind: SensorKind) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter().filter(move |s| s.kind == kind)
    }

    pub fn alerts(&self) -> usize {
        self.sensors.iter().filter(|s| s.alert).count()
    }

    /// Updates every sensor. A sensor whose reading fails keeps its previous
    /// state and its error is returned; the rest still update.
    pub fn update_all<R: Rng + ?Sized>(
        &mut self,
        conditions: &Conditions,
        plants: &[Plant],
        rng: &mut R,
        events: &Emitter<'_>,
    ) -> Vec<GardenError> {
        let mut failures = Vec::new();
        for sensor in &mut self.sensors {
            let before = sensor.clone();
            if let Err(err) = sensor.update(conditions, plants, rng, events) {
                *sensor = before;
                failures.push(GardenError::EntityUpdate {
                    entity: sensor.label(),
                    reason: err.to_string(),
                });
            }
        }
        failures
    }
}
