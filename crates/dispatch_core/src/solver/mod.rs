pub mod discount;
pub mod exact;
pub mod greedy;
pub mod strategy;
pub mod types;

use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use bevy_ecs::prelude::Resource;
use log::{debug, warn};

use crate::config::{SolverConfig, SolverStrategyKind};
use crate::ecs::{RequesterInfo, VehicleInfo};
use crate::error::SolveError;

pub use discount::PriorityDiscount;
pub use exact::ExactAssignment;
pub use greedy::GreedyAssignment;
pub use strategy::AssignmentStrategy;
pub use types::{candidate_pair, Assignment, AssignmentProblem, CandidatePair};

/// Result of one solve, with which strategy produced it.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub assignment: Assignment,
    pub strategy: &'static str,
    /// Set when the primary strategy failed and greedy ran instead.
    pub fallback_reason: Option<SolveError>,
}

impl SolveOutcome {
    pub fn used_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Matches idle vehicles to waiting requesters, falling back to greedy whenever the
/// primary strategy cannot produce an answer.
pub struct ConstraintSolver {
    primary: Box<dyn AssignmentStrategy>,
    fallback: GreedyAssignment,
    discount: PriorityDiscount,
    max_pickup_distance: Option<u32>,
}

impl std::fmt::Debug for ConstraintSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintSolver")
            .field("primary", &self.primary.name())
            .field("discount", &self.discount)
            .field("max_pickup_distance", &self.max_pickup_distance)
            .finish()
    }
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self::new(Box::new(ExactAssignment::default()), PriorityDiscount::default())
    }
}

impl ConstraintSolver {
    pub fn new(primary: Box<dyn AssignmentStrategy>, discount: PriorityDiscount) -> Self {
        Self {
            primary,
            fallback: GreedyAssignment,
            discount,
            max_pickup_distance: None,
        }
    }

    /// Never pair a vehicle with a pickup farther than `distance`.
    pub fn with_max_pickup_distance(mut self, distance: Option<u32>) -> Self {
        self.max_pickup_distance = distance;
        self
    }

    pub fn from_config(config: &SolverConfig, discount: PriorityDiscount) -> Self {
        let primary: Box<dyn AssignmentStrategy> = match config.strategy {
            SolverStrategyKind::Exact => Box::new(ExactAssignment::new(
                config.work_budget,
                Duration::from_millis(config.time_budget_ms),
            )),
            SolverStrategyKind::Greedy => Box::new(GreedyAssignment),
        };
        Self::new(primary, discount).with_max_pickup_distance(config.max_pickup_distance)
    }

    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }

    /// Vehicle id -> requester id. Empty when nothing is eligible.
    pub fn solve(&self, vehicles: &[VehicleInfo], requesters: &[RequesterInfo]) -> Assignment {
        self.solve_detailed(vehicles, requesters).assignment
    }

    pub fn solve_detailed(
        &self,
        vehicles: &[VehicleInfo],
        requesters: &[RequesterInfo],
    ) -> SolveOutcome {
        let problem = AssignmentProblem::build(
            vehicles,
            requesters,
            &self.discount,
            self.max_pickup_distance,
        );
        if problem.is_empty() {
            return SolveOutcome {
                assignment: Assignment::new(),
                strategy: self.primary.name(),
                fallback_reason: None,
            };
        }
        match self.primary.assign(&problem) {
            Ok(assignment) => {
                debug!(
                    "{} solver matched {} of {} vehicles",
                    self.primary.name(),
                    assignment.len(),
                    problem.vehicle_ids.len()
                );
                SolveOutcome {
                    assignment,
                    strategy: self.primary.name(),
                    fallback_reason: None,
                }
            }
            Err(err) => {
                warn!("{} solver failed ({err}); using greedy", self.primary.name());
                SolveOutcome {
                    assignment: self.fallback.assign_infallible(&problem),
                    strategy: self.fallback.name(),
                    fallback_reason: Some(err),
                }
            }
        }
    }

    /// Cheapest eligible requester for one vehicle: lowest quantized cost, then lowest id.
    pub fn best_requester_for<'a, I>(
        &self,
        vehicle: &VehicleInfo,
        requesters: I,
    ) -> Option<(&'a RequesterInfo, CandidatePair)>
    where
        I: IntoIterator<Item = &'a RequesterInfo>,
    {
        requesters
            .into_iter()
            .filter_map(|r| {
                candidate_pair(vehicle, r, &self.discount, self.max_pickup_distance)
                    .map(|pair| (r, pair))
            })
            .min_by(|(ra, a), (rb, b)| {
                a.quantized_cost
                    .cmp(&b.quantized_cost)
                    .then_with(|| ra.id.cmp(&rb.id))
            })
    }
}

/// Resource wrapper for the solver.
#[derive(Resource, Debug, Default)]
pub struct ConstraintSolverResource(pub ConstraintSolver);

impl std::ops::Deref for ConstraintSolverResource {
    type Target = ConstraintSolver;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Allows at most one global solver pass in flight.
#[derive(Resource, Debug, Default)]
pub struct SolverGate(Mutex<()>);

/// Held for the duration of a solver pass; dropping it reopens the gate.
#[derive(Debug)]
pub struct SolverPass<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl SolverGate {
    /// `None` when another pass holds the gate. Never blocks.
    pub fn try_enter(&self) -> Option<SolverPass<'_>> {
        match self.0.try_lock() {
            Ok(guard) => Some(SolverPass { _guard: guard }),
            // A pass that panicked leaves nothing behind worth protecting.
            Err(TryLockError::Poisoned(poisoned)) => Some(SolverPass {
                _guard: poisoned.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}
