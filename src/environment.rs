//! Day/night cycle plus slowly drifting weather.

use std::f64::consts::{FRAC_PI_2, TAU};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rng::RngExt;

pub const DAY_CYCLE_TICKS: u64 = 200;
pub const WEATHER_DRIFT_INTERVAL: u64 = 50;

pub const HUMIDITY_BIAS_LIMIT: f64 = 15.0;
pub const CLOUD_COVER_MAX: f64 = 0.5;
pub const HUMIDITY_MIN: f64 = 15.0;
pub const HUMIDITY_MAX: f64 = 98.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    /// Air temperature in °F.
    pub temperature: f64,
    /// Light intensity, 0-100.
    pub light: f64,
    /// Relative humidity, 0-100 %.
    pub humidity: f64,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            temperature: 72.0,
            light: 60.0,
            humidity: 50.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentModel {
    humidity_bias: f64,
    cloud_cover: f64,
}

impl EnvironmentModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn humidity_bias(&self) -> f64 {
        self.humidity_bias
    }

    pub fn cloud_cover(&self) -> f64 {
        self.cloud_cover
    }

    pub fn advance<R: Rng + ?Sized>(&mut self, tick: u64, rng: &mut R) -> Conditions {
        if tick % WEATHER_DRIFT_INTERVAL == 0 {
            self.humidity_bias = (self.humidity_bias + rng.gaussian() * 1.5)
                .clamp(-HUMIDITY_BIAS_LIMIT, HUMIDITY_BIAS_LIMIT);
            self.cloud_cover =
                (self.cloud_cover + rng.gaussian() * 0.04).clamp(0.0, CLOUD_COVER_MAX);
        }

        let phase = day_progress(tick) * TAU;

        let natural_light = (50.0 + 45.0 * (phase - FRAC_PI_2).sin()) * (1.0 - self.cloud_cover);
        let light = natural_light.clamp(0.0, 100.0);

        let temperature = 65.0 + rng.gaussian() * 0.5 + 7.0 * (phase - FRAC_PI_2).sin();

        // Humidity peaks at night and dips in the afternoon.
        let swing = 18.0 * (phase + FRAC_PI_2).sin();
        let humidity = (58.0 + swing + self.humidity_bias + rng.gaussian() * 3.0)
            .clamp(HUMIDITY_MIN, HUMIDITY_MAX);

        Conditions {
            temperature,
            light,
            humidity,
        }
    }
}

pub fn day_progress(tick: u64) -> f64 {
    (tick % DAY_CYCLE_TICKS) as f64 / DAY_CYCLE_TICKS as f64
}

/// 1-based day number.
pub fn day_number(tick: u64) -> u64 {
    tick / DAY_CYCLE_TICKS + 1
}

pub fn is_daytime(tick: u64) -> bool {
    day_progress(tick) < 0.5
}
