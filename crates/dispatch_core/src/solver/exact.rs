//! Exact assignment via Kuhn-Munkres (maximum-weight bipartite matching).
//!
//! Rows are vehicles, columns are requesters plus one dummy column per vehicle, so every
//! vehicle may stay unmatched. A real pair weighs `big - (quantized_cost * K + tie)` and
//! a dummy cell weighs `-tie`. `big` is large enough that one more matched pair always
//! outweighs any cost saving, and `K` keeps every tie sum below one cost unit.
//!
//! The tie term reads each vehicle's requester index as one digit of a base `m + 1`
//! number, vehicle 0 most significant and "unmatched" the largest digit. Among
//! equal-cost matchings the smallest number wins, which is the assignment that is
//! lexicographically smallest in vehicle id, then requester id.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use log::debug;
use pathfinding::kuhn_munkres::{kuhn_munkres, Weights};

use crate::error::SolveError;

use super::strategy::AssignmentStrategy;
use super::types::{Assignment, AssignmentProblem};

/// Upper bound on `rows * rows * columns` before the solve is refused.
pub const DEFAULT_WORK_BUDGET: u64 = 8_000_000;

pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_millis(50);

struct MatchWeights {
    columns: usize,
    cells: Vec<i128>,
}

impl Weights<i128> for MatchWeights {
    fn rows(&self) -> usize {
        if self.columns == 0 {
            0
        } else {
            self.cells.len() / self.columns
        }
    }

    fn columns(&self) -> usize {
        self.columns
    }

    fn at(&self, row: usize, col: usize) -> i128 {
        self.cells[row * self.columns + col]
    }

    fn neg(&self) -> Self {
        MatchWeights {
            columns: self.columns,
            cells: self.cells.iter().map(|&x| x.saturating_neg()).collect(),
        }
    }
}

/// Tie term of one cell and the exclusive bound on any matching's tie sum.
struct TieOrder {
    /// Place value of each vehicle's digit; empty for the linear fallback.
    places: Vec<i128>,
    requesters: i128,
    span: i128,
}

impl TieOrder {
    fn new(vehicles: usize, requesters: usize) -> Result<Self, SolveError> {
        let n = i128::try_from(vehicles).map_err(|_| SolveError::WeightOverflow)?;
        let m = i128::try_from(requesters).map_err(|_| SolveError::WeightOverflow)?;
        if let Some(places) = positional_places(vehicles, m + 1) {
            let span = places
                .first()
                .and_then(|top| top.checked_mul(m + 1))
                .unwrap_or(1);
            return Ok(Self {
                places,
                requesters: m,
                span,
            });
        }
        debug!("{vehicles}x{requesters} too wide for positional tie-break; using linear order");
        let span = n
            .checked_mul(m)
            .and_then(|x| x.checked_mul(n.min(m)))
            .and_then(|x| x.checked_add(1))
            .ok_or(SolveError::WeightOverflow)?;
        Ok(Self {
            places: Vec::new(),
            requesters: m,
            span,
        })
    }

    /// `digit` is the requester index, or `requesters` for the dummy column.
    fn tie(&self, vehicle: usize, digit: usize) -> i128 {
        let digit = digit as i128;
        match self.places.get(vehicle) {
            Some(place) => digit * place,
            None if digit == self.requesters => 0,
            None => vehicle as i128 * self.requesters + digit,
        }
    }
}

/// `base^(n-1-v)` for every vehicle `v`, or `None` when `base^n` does not fit with
/// room left for costs.
fn positional_places(vehicles: usize, base: i128) -> Option<Vec<i128>> {
    let span = base.checked_pow(u32::try_from(vehicles).ok()?)?;
    // Leave headroom for cost keys and label sums.
    if span > i128::MAX >> 64 {
        return None;
    }
    let mut places = vec![1_i128; vehicles];
    for v in (0..vehicles.saturating_sub(1)).rev() {
        places[v] = places[v + 1].checked_mul(base)?;
    }
    Some(places)
}

#[derive(Debug, Clone)]
pub struct ExactAssignment {
    work_budget: u64,
    time_budget: Duration,
}

impl Default for ExactAssignment {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_BUDGET, DEFAULT_TIME_BUDGET)
    }
}

impl ExactAssignment {
    pub fn new(work_budget: u64, time_budget: Duration) -> Self {
        Self {
            work_budget,
            time_budget,
        }
    }

    fn check_deadline(&self, started: Instant) -> Result<(), SolveError> {
        if started.elapsed() > self.time_budget {
            return Err(SolveError::TimedOut {
                budget_ms: self.time_budget.as_millis() as u64,
            });
        }
        Ok(())
    }

    fn build_weights(&self, problem: &AssignmentProblem) -> Result<MatchWeights, SolveError> {
        let n = problem.vehicle_ids.len();
        let m = problem.requester_ids.len();
        let columns = m + n;
        let smaller = n.min(m) as i128;
        let ties = TieOrder::new(n, m)?;

        let k = ties.span;
        let max_q = problem
            .pairs
            .iter()
            .map(|p| i128::from(p.quantized_cost.max(0)))
            .max()
            .unwrap_or(0);
        let big = smaller
            .checked_mul(max_q)
            .and_then(|x| x.checked_add(1))
            .and_then(|x| x.checked_mul(k))
            .and_then(|x| x.checked_add(1))
            .ok_or(SolveError::WeightOverflow)?;
        // Headroom for the label sums kuhn_munkres keeps internally.
        big.checked_mul(2 * (n + m) as i128 + 2)
            .ok_or(SolveError::WeightOverflow)?;

        let mut cells = vec![0_i128; n * columns];
        for row in 0..n {
            let unmatched = -ties.tie(row, m);
            for col in 0..columns {
                cells[row * columns + col] = if col < m { -big } else { unmatched };
            }
        }
        for pair in &problem.pairs {
            let key = i128::from(pair.quantized_cost.max(0)) * k
                + ties.tie(pair.vehicle, pair.requester);
            cells[pair.vehicle * columns + pair.requester] = big - key;
        }
        Ok(MatchWeights { columns, cells })
    }
}

impl AssignmentStrategy for ExactAssignment {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn assign(&self, problem: &AssignmentProblem) -> Result<Assignment, SolveError> {
        if problem.is_empty() {
            return Ok(Assignment::new());
        }
        let n = problem.vehicle_ids.len() as u64;
        let m = problem.requester_ids.len() as u64;
        let work = n.saturating_mul(n).saturating_mul(m + n);
        if work > self.work_budget {
            return Err(SolveError::BudgetExceeded {
                work,
                budget: self.work_budget,
            });
        }

        let started = Instant::now();
        let weights = self.build_weights(problem)?;
        self.check_deadline(started)?;

        let (_total, columns) = catch_unwind(AssertUnwindSafe(|| kuhn_munkres(&weights)))
            .map_err(|_| SolveError::Unavailable("kuhn_munkres panicked".to_string()))?;
        self.check_deadline(started)?;

        let requesters = problem.requester_ids.len();
        let matched = columns
            .into_iter()
            .enumerate()
            .filter(|&(row, col)| col < requesters && weights.at(row, col) > 0);
        Ok(problem.assignment_from(matched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::VehicleInfo;
    use crate::grid::GridPosition;
    use crate::solver::{GreedyAssignment, PriorityDiscount};
    use crate::test_helpers::requester;

    fn total_cost(problem: &AssignmentProblem, assignment: &Assignment) -> i64 {
        assignment
            .pairs()
            .map(|(v, r)| {
                problem
                    .pairs
                    .iter()
                    .find(|p| problem.vehicle_ids[p.vehicle] == v && problem.requester_ids[p.requester] == r)
                    .map(|p| p.quantized_cost)
                    .expect("assigned pair must be a candidate")
            })
            .sum()
    }

    #[test]
    fn beats_greedy_on_crossing_pairs() {
        // Greedy takes (v0, r0) at cost 2 and is left with (v1, r1) at 7;
        // the optimum is 3 + 2.
        let vehicles = vec![
            VehicleInfo::new("vehicle-000", GridPosition::new(0, 0), 4),
            VehicleInfo::new("vehicle-001", GridPosition::new(4, 0), 4),
        ];
        let requesters = vec![
            requester("req-00000", (2, 0), (9, 9)),
            requester("req-00001", (0, 3), (9, 0)),
        ];
        let problem =
            AssignmentProblem::build(&vehicles, &requesters, &PriorityDiscount::default(), None);
        let exact = ExactAssignment::default().assign(&problem).expect("exact solve");
        let greedy = GreedyAssignment.assign_infallible(&problem);
        assert_eq!(exact.get("vehicle-000"), Some("req-00001"));
        assert_eq!(exact.get("vehicle-001"), Some("req-00000"));
        assert_eq!(total_cost(&problem, &exact), 5_000);
        assert_eq!(total_cost(&problem, &greedy), 9_000);
    }

    #[test]
    fn prefers_more_matches_over_cheaper_ones() {
        // v1 has one free seat so it can never carry r1; taking the cheapest
        // pair (v0, r0) would strand r1.
        let mut nearly_full = VehicleInfo::new("vehicle-001", GridPosition::new(3, 0), 4);
        nearly_full.current_load = 3;
        let vehicles = vec![VehicleInfo::new("vehicle-000", GridPosition::new(0, 0), 4), nearly_full];
        let mut big_party = requester("req-00001", (0, 5), (4, 4));
        big_party.party_size = 3;
        let requesters = vec![requester("req-00000", (1, 0), (9, 9)), big_party];
        let problem =
            AssignmentProblem::build(&vehicles, &requesters, &PriorityDiscount::default(), None);
        let exact = ExactAssignment::default().assign(&problem).expect("exact solve");
        assert_eq!(exact.len(), 2);
        assert_eq!(exact.get("vehicle-000"), Some("req-00001"));
        assert_eq!(exact.get("vehicle-001"), Some("req-00000"));
        assert_eq!(GreedyAssignment.assign_infallible(&problem).len(), 1);
    }

    #[test]
    fn refuses_work_over_budget() {
        let vehicles: Vec<_> = (0..4)
            .map(|i| VehicleInfo::new(format!("vehicle-{i:03}"), GridPosition::new(i, 0), 4))
            .collect();
        let requesters: Vec<_> = (0..4)
            .map(|i| requester(&format!("req-{i:05}"), (i, 3), (0, 0)))
            .collect();
        let problem =
            AssignmentProblem::build(&vehicles, &requesters, &PriorityDiscount::default(), None);
        let err = ExactAssignment::new(10, DEFAULT_TIME_BUDGET)
            .assign(&problem)
            .expect_err("budget of 10 is too small");
        assert!(matches!(err, SolveError::BudgetExceeded { budget: 10, .. }));
    }

    fn tied_problem(vehicles: usize, requesters: usize) -> AssignmentProblem {
        let vehicles: Vec<_> = (0..vehicles)
            .map(|i| VehicleInfo::new(format!("vehicle-{i:03}"), GridPosition::new(0, 0), 4))
            .collect();
        let requesters: Vec<_> = (0..requesters)
            .map(|i| requester(&format!("req-{i:05}"), (0, 0), (5, 5)))
            .collect();
        AssignmentProblem::build(&vehicles, &requesters, &PriorityDiscount::default(), None)
    }

    #[test]
    fn equal_costs_go_to_smaller_ids_in_order() {
        let exact = ExactAssignment::default()
            .assign(&tied_problem(3, 3))
            .expect("exact solve");
        assert_eq!(exact.get("vehicle-000"), Some("req-00000"));
        assert_eq!(exact.get("vehicle-001"), Some("req-00001"));
        assert_eq!(exact.get("vehicle-002"), Some("req-00002"));

        let short = ExactAssignment::default()
            .assign(&tied_problem(3, 2))
            .expect("exact solve");
        assert_eq!(short.len(), 2);
        assert_eq!(short.get("vehicle-000"), Some("req-00000"));
        assert_eq!(short.get("vehicle-001"), Some("req-00001"));
        assert_eq!(short.get("vehicle-002"), None);
    }

    #[test]
    fn all_tie_grids_match_greedy() {
        for n in 1..=5 {
            for m in 1..=5 {
                let problem = tied_problem(n, m);
                let exact = ExactAssignment::default().assign(&problem).expect("exact solve");
                let greedy = GreedyAssignment.assign_infallible(&problem);
                assert_eq!(exact, greedy, "{n} vehicles x {m} requesters");
            }
        }
    }

    #[test]
    fn wide_problems_still_solve_with_linear_tie_order() {
        let problem = tied_problem(40, 40);
        assert!(positional_places(40, 41).is_none());
        let exact = ExactAssignment::default().assign(&problem).expect("exact solve");
        assert_eq!(exact.len(), 40);
    }
}
