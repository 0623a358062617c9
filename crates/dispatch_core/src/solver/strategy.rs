use crate::error::SolveError;

use super::types::{Assignment, AssignmentProblem};

/// A way of turning an [`AssignmentProblem`] into a conflict-free [`Assignment`].
///
/// Implementations must only return pairs present in `problem.pairs`, and each vehicle
/// and requester at most once.
pub trait AssignmentStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn assign(&self, problem: &AssignmentProblem) -> Result<Assignment, SolveError>;
}
