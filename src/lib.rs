pub mod driver;
pub mod ecology;
pub mod engine;
pub mod environment;
pub mod error;
pub mod events;
pub mod geometry;
pub mod insect;
pub mod modules;
pub mod plant;
pub mod rng;
pub mod scenario;
pub mod sensor;
pub mod snapshot;
pub mod species;
pub mod web;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings, TickSummary};
pub use error::GardenError;
pub use scenario::Scenario;
pub use world::{EntityId, World};
