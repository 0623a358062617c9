pub mod clock;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod ecs;
pub mod error;
pub mod grid;
pub mod patrol;
pub mod pricing;
pub mod registry;
pub mod runner;
pub mod solver;
pub mod spawner;
pub mod systems;
pub mod telemetry;
pub mod transport;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::{DispatchConfig, VehicleSpec};
pub use dispatch::DispatchSystem;
pub use error::{ConfigError, DispatchError, SolveError};
pub use grid::{GridNetwork, GridPosition};
pub use spawner::RequesterRequest;
