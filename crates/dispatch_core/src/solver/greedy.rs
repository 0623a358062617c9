//! Greedy assignment: repeatedly take the globally cheapest remaining pair.

use crate::error::SolveError;

use super::strategy::AssignmentStrategy;
use super::types::{Assignment, AssignmentProblem};

#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyAssignment;

impl GreedyAssignment {
    /// Never fails; used directly as the fallback.
    pub fn assign_infallible(&self, problem: &AssignmentProblem) -> Assignment {
        // Indices are in sorted id order, so ordering by index is the id tie-break.
        let mut order: Vec<usize> = (0..problem.pairs.len()).collect();
        order.sort_by_key(|&i| {
            let pair = &problem.pairs[i];
            (pair.quantized_cost, pair.vehicle, pair.requester)
        });

        let mut vehicle_used = vec![false; problem.vehicle_ids.len()];
        let mut requester_used = vec![false; problem.requester_ids.len()];
        let mut matched = Vec::new();
        for i in order {
            let pair = &problem.pairs[i];
            if vehicle_used[pair.vehicle] || requester_used[pair.requester] {
                continue;
            }
            vehicle_used[pair.vehicle] = true;
            requester_used[pair.requester] = true;
            matched.push((pair.vehicle, pair.requester));
        }
        problem.assignment_from(matched)
    }
}

impl AssignmentStrategy for GreedyAssignment {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn assign(&self, problem: &AssignmentProblem) -> Result<Assignment, SolveError> {
        Ok(self.assign_infallible(problem))
    }
}
