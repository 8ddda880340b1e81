//! Error types for the garden core.
//!
//! Entity, module and stage failures are never propagated out of a tick;
//! they are converted into [`GardenError`] values, reported to the event
//! sink and recorded in the tick summary.

use std::any::Any;

use crate::geometry::{GridBounds, Position};

#[derive(Debug, Clone, thiserror::Error)]
pub enum GardenError {
    /// An environmental input was NaN or infinite.
    #[error("non-finite {quantity}: {value}")]
    NonFiniteCondition { quantity: &'static str, value: f64 },

    /// A seeded entity was placed off the grid.
    #[error("position {position} is outside the {}x{} grid", .bounds.rows, .bounds.cols)]
    OutOfBounds {
        position: Position,
        bounds: GridBounds,
    },

    /// A single plant, insect or sensor failed to update.
    #[error("entity {entity} failed to update: {reason}")]
    EntityUpdate { entity: String, reason: String },

    /// A control module failed to update.
    #[error("module {module} failed to update: {reason}")]
    ModuleUpdate { module: String, reason: String },

    /// An orchestration stage of the tick failed.
    #[error("tick {tick} stage {stage} failed: {reason}")]
    Stage {
        tick: u64,
        stage: &'static str,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A manual override or setting targeted a module that is not registered.
    #[error("no {0} module is registered")]
    MissingModule(&'static str),
}

pub type Result<T, E = GardenError> = std::result::Result<T, E>;

pub fn ensure_finite(quantity: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GardenError::NonFiniteCondition { quantity, value })
    }
}

/// Renders a caught panic payload as text.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panic: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panic: {msg}")
    } else {
        "panic with non-string payload".to_string()
    }
}
