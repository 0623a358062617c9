//! Static configuration of a dispatch run. Built once, validated, then copied into
//! ECS resources; nothing here is reloaded at runtime.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::ecs::RequesterInfo;
use crate::error::ConfigError;
use crate::grid::{GridNetwork, GridPosition};
use crate::pricing::PricingConfig;
use crate::solver::exact::{DEFAULT_TIME_BUDGET, DEFAULT_WORK_BUDGET};
use crate::solver::PriorityDiscount;
use crate::telemetry::SnapshotConfig;

/// How far a patrolling vehicle looks for requesters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensingConfig {
    /// Base radius in grid cells (Manhattan).
    pub radius: f64,
    /// Radius grows by this fraction per second a requester has waited.
    pub expansion_rate_per_sec: f64,
    /// Cap on the wait-based growth factor.
    pub max_expansion: f64,
    /// Extra factor for requesters with any priority flag.
    pub priority_radius_multiplier: f64,
}

impl Default for SensingConfig {
    fn default() -> Self {
        Self {
            radius: 6.0,
            expansion_rate_per_sec: 0.02,
            max_expansion: 3.0,
            priority_radius_multiplier: 1.8,
        }
    }
}

impl SensingConfig {
    /// Radius within which `requester` is visible to a patrolling vehicle.
    pub fn effective_radius(&self, requester: &RequesterInfo) -> f64 {
        let growth = (1.0 + requester.wait_time.max(0.0) * self.expansion_rate_per_sec)
            .min(self.max_expansion.max(1.0));
        let priority = if requester.priority.any() {
            self.priority_radius_multiplier
        } else {
            1.0
        };
        self.radius * growth * priority
    }

    pub fn in_range(&self, from: GridPosition, requester: &RequesterInfo) -> bool {
        from.manhattan(requester.pickup_position) as f64 <= self.effective_radius(requester)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStrategyKind {
    Exact,
    Greedy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub strategy: SolverStrategyKind,
    /// Largest `vehicles^2 * (requesters + vehicles)` the exact solver accepts.
    pub work_budget: u64,
    pub time_budget_ms: u64,
    /// Pairs whose pickup is farther than this (Manhattan) are never matched.
    pub max_pickup_distance: Option<u32>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            strategy: SolverStrategyKind::Exact,
            work_budget: DEFAULT_WORK_BUDGET,
            time_budget_ms: DEFAULT_TIME_BUDGET.as_millis() as u64,
            max_pickup_distance: None,
        }
    }
}

/// Random requester generation and respawn policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequesterSpawnConfig {
    /// Spawn a fresh random requester after every delivery.
    pub respawn_on_delivery: bool,
    /// Spawn a random requester every this many ms of simulation time.
    pub spawn_interval_ms: Option<u64>,
    pub min_trip_distance: u32,
    pub placement_attempts: u32,
    pub max_party_size: u32,
    pub disabled_probability: f64,
    pub elderly_probability: f64,
    pub child_probability: f64,
    pub pregnant_probability: f64,
}

impl Default for RequesterSpawnConfig {
    fn default() -> Self {
        Self {
            respawn_on_delivery: true,
            spawn_interval_ms: None,
            min_trip_distance: 5,
            placement_attempts: 10,
            max_party_size: 3,
            disabled_probability: 0.10,
            elderly_probability: 0.15,
            child_probability: 0.10,
            pregnant_probability: 0.10,
        }
    }
}

/// Explicit vehicle placement. An empty fleet list means "generate `vehicle_count`
/// vehicles at random positions with the built-in patrol patterns".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    pub start: GridPosition,
    /// Overrides the generated patrol cycle.
    pub cycle: Option<Vec<GridPosition>>,
    /// Overrides `DispatchConfig::vehicle_capacity`.
    pub capacity: Option<u32>,
}

impl VehicleSpec {
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            start: GridPosition::new(x, y),
            cycle: None,
            capacity: None,
        }
    }

    pub fn with_cycle(mut self, cycle: Vec<GridPosition>) -> Self {
        self.cycle = Some(cycle);
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
pub struct DispatchConfig {
    pub grid_width: i32,
    pub grid_height: i32,
    pub vehicle_count: usize,
    pub vehicle_capacity: u32,
    pub fleet: Vec<VehicleSpec>,
    pub initial_requesters: usize,
    pub sensing: SensingConfig,
    /// Simulation time between two opportunity scans of the same vehicle.
    pub diversion_check_interval_ms: u64,
    pub discount: PriorityDiscount,
    pub solver: SolverConfig,
    pub pricing: PricingConfig,
    pub spawn: RequesterSpawnConfig,
    pub snapshots: SnapshotConfig,
    pub seed: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            grid_width: 20,
            grid_height: 20,
            vehicle_count: 4,
            vehicle_capacity: 4,
            fleet: Vec::new(),
            initial_requesters: 4,
            sensing: SensingConfig::default(),
            diversion_check_interval_ms: 3_000,
            discount: PriorityDiscount::default(),
            solver: SolverConfig::default(),
            pricing: PricingConfig::default(),
            spawn: RequesterSpawnConfig::default(),
            snapshots: SnapshotConfig::default(),
            seed: 0,
        }
    }
}

impl DispatchConfig {
    pub fn with_grid(mut self, width: i32, height: i32) -> Self {
        self.grid_width = width;
        self.grid_height = height;
        self
    }

    pub fn with_vehicle_count(mut self, count: usize) -> Self {
        self.vehicle_count = count;
        self
    }

    pub fn with_vehicle_capacity(mut self, capacity: u32) -> Self {
        self.vehicle_capacity = capacity;
        self
    }

    pub fn with_fleet(mut self, fleet: Vec<VehicleSpec>) -> Self {
        self.vehicle_count = fleet.len();
        self.fleet = fleet;
        self
    }

    pub fn with_initial_requesters(mut self, count: usize) -> Self {
        self.initial_requesters = count;
        self
    }

    pub fn with_sensing(mut self, sensing: SensingConfig) -> Self {
        self.sensing = sensing;
        self
    }

    pub fn with_sensing_radius(mut self, radius: f64) -> Self {
        self.sensing.radius = radius;
        self
    }

    pub fn with_diversion_check_interval_ms(mut self, interval_ms: u64) -> Self {
        self.diversion_check_interval_ms = interval_ms;
        self
    }

    pub fn with_discount(mut self, discount: PriorityDiscount) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_solver_strategy(mut self, strategy: SolverStrategyKind) -> Self {
        self.solver.strategy = strategy;
        self
    }

    pub fn with_max_pickup_distance(mut self, distance: Option<u32>) -> Self {
        self.solver.max_pickup_distance = distance;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_spawn(mut self, spawn: RequesterSpawnConfig) -> Self {
        self.spawn = spawn;
        self
    }

    pub fn with_respawn_on_delivery(mut self, enabled: bool) -> Self {
        self.spawn.respawn_on_delivery = enabled;
        self
    }

    pub fn with_snapshots(mut self, snapshots: SnapshotConfig) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Largest party any single vehicle can seat.
    pub fn max_vehicle_capacity(&self) -> u32 {
        if self.fleet.is_empty() {
            return self.vehicle_capacity;
        }
        self.fleet
            .iter()
            .map(|spec| spec.capacity.unwrap_or(self.vehicle_capacity))
            .max()
            .unwrap_or(self.vehicle_capacity)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = GridNetwork::new(self.grid_width, self.grid_height)?;
        if self.vehicle_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        for (index, spec) in self.fleet.iter().enumerate() {
            let vehicle_id = crate::registry::vehicle_id(index);
            if spec.capacity == Some(0) {
                return Err(ConfigError::ZeroCapacity);
            }
            if !grid.contains(spec.start) {
                return Err(ConfigError::WaypointOutOfBounds {
                    vehicle_id,
                    position: spec.start,
                });
            }
            if let Some(cycle) = &spec.cycle {
                if cycle.is_empty() {
                    return Err(ConfigError::EmptyCycle(vehicle_id));
                }
                if let Some(&position) = cycle.iter().find(|p| !grid.contains(**p)) {
                    return Err(ConfigError::WaypointOutOfBounds {
                        vehicle_id,
                        position,
                    });
                }
            }
        }
        positive("diversion_check_interval_ms", self.diversion_check_interval_ms as f64)?;
        positive("solver.time_budget_ms", self.solver.time_budget_ms as f64)?;
        if let Some(distance) = self.solver.max_pickup_distance {
            positive("solver.max_pickup_distance", distance as f64)?;
        }
        positive("snapshots.interval_ms", self.snapshots.interval_ms as f64)?;
        positive("spawn.max_party_size", self.spawn.max_party_size as f64)?;
        if let Some(interval) = self.spawn.spawn_interval_ms {
            positive("spawn.spawn_interval_ms", interval as f64)?;
        }
        positive("sensing.max_expansion", self.sensing.max_expansion)?;
        positive(
            "sensing.priority_radius_multiplier",
            self.sensing.priority_radius_multiplier,
        )?;
        positive("discount.wait_horizon_secs", self.discount.wait_horizon_secs)?;
        if self.sensing.radius.is_nan() || self.sensing.radius < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "sensing.radius",
                value: self.sensing.radius,
            });
        }
        for (name, value) in [
            ("spawn.disabled_probability", self.spawn.disabled_probability),
            ("spawn.elderly_probability", self.spawn.elderly_probability),
            ("spawn.child_probability", self.spawn.child_probability),
            ("spawn.pregnant_probability", self.spawn.pregnant_probability),
            ("discount.wait_floor", self.discount.wait_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}
