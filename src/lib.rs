pub mod aggregate;
pub mod availability;
pub mod config;
pub mod day_context;
pub mod error;
pub mod form;
pub mod matchday;
pub mod model;
pub mod scoring;
pub mod squad;
pub mod store;
pub mod synthetic;

pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use matchday::{DayReport, Fixture, FixtureSource, Schedule, simulate_day};
pub use model::{AttributeStore, World};
