//! Error types for the dispatch core.
//!
//! Everything here is recoverable: callers log, count and carry on with the next vehicle
//! or the next tick.

use thiserror::Error;

use crate::grid::GridPosition;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("position {position} is outside the {width}x{height} grid")]
    OutOfBounds {
        position: GridPosition,
        width: i32,
        height: i32,
    },

    #[error("vehicle {vehicle_id} cannot seat {party_size} (only {available} free)")]
    CapacityExceeded {
        vehicle_id: String,
        party_size: u32,
        available: u32,
    },

    #[error("vehicle {vehicle_id} lost requester {requester_id} (held by {holder:?})")]
    ClaimConflict {
        requester_id: String,
        vehicle_id: String,
        holder: Option<String>,
    },

    #[error("vehicle {vehicle_id} is already serving a mission")]
    VehicleBusy { vehicle_id: String },

    #[error("vehicle {vehicle_id} has a mission but no target position")]
    MissingTarget { vehicle_id: String },

    #[error("unknown vehicle {0}")]
    UnknownVehicle(String),

    #[error("unknown requester {0}")]
    UnknownRequester(String),

    #[error("requester {0} is already picked up and cannot be cancelled")]
    NotCancellable(String),

    #[error("party size {party_size} is invalid (fleet seats at most {max_capacity})")]
    InvalidPartySize { party_size: u32, max_capacity: u32 },
}

/// Failures of an assignment strategy. Never surfaced past the solver, which falls
/// back to the greedy heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("exact solver unavailable: {0}")]
    Unavailable(String),

    #[error("problem needs {work} work units, budget is {budget}")]
    BudgetExceeded { work: u64, budget: u64 },

    #[error("exact solve exceeded the {budget_ms} ms time budget")]
    TimedOut { budget_ms: u64 },

    #[error("cost weights overflow the integer assignment matrix")]
    WeightOverflow,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: i32, height: i32 },

    #[error("vehicle capacity must be at least 1")]
    ZeroCapacity,

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("waypoint {position} of vehicle {vehicle_id} is outside the grid")]
    WaypointOutOfBounds {
        vehicle_id: String,
        position: GridPosition,
    },

    #[error("patrol cycle of vehicle {0} has no waypoints")]
    EmptyCycle(String),

    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
}
