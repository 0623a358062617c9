use std::collections::BTreeMap;

use crate::ecs::{RequesterInfo, VehicleInfo};

use super::discount::PriorityDiscount;

/// Costs are compared at this resolution so float noise cannot break ties.
const COST_QUANTUM: f64 = 1_000.0;

/// Conflict-free matching: vehicle id -> requester id, each id at most once per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment(BTreeMap<String, String>);

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, vehicle_id: &str) -> Option<&str> {
        self.0.get(vehicle_id).map(String::as_str)
    }

    pub fn contains_requester(&self, requester_id: &str) -> bool {
        self.0.values().any(|r| r == requester_id)
    }

    /// Pairs in vehicle id order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(v, r)| (v.as_str(), r.as_str()))
    }

    pub(crate) fn insert(&mut self, vehicle_id: String, requester_id: String) {
        debug_assert!(!self.0.contains_key(&vehicle_id));
        debug_assert!(!self.contains_requester(&requester_id));
        self.0.insert(vehicle_id, requester_id);
    }
}

/// One eligible vehicle-requester pairing with its discounted cost.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePair {
    /// Index into [`AssignmentProblem::vehicle_ids`].
    pub vehicle: usize,
    /// Index into [`AssignmentProblem::requester_ids`].
    pub requester: usize,
    pub pickup_distance: u32,
    pub cost: f64,
    /// `cost` scaled to integer thousandths.
    pub quantized_cost: i64,
}

/// Eligible pairs of one solve. Both id lists are sorted, so index order is
/// lexicographic id order.
#[derive(Debug, Clone, Default)]
pub struct AssignmentProblem {
    pub vehicle_ids: Vec<String>,
    pub requester_ids: Vec<String>,
    pub pairs: Vec<CandidatePair>,
}

impl AssignmentProblem {
    pub fn build(
        vehicles: &[VehicleInfo],
        requesters: &[RequesterInfo],
        discount: &PriorityDiscount,
        max_pickup_distance: Option<u32>,
    ) -> Self {
        let mut vehicles: Vec<&VehicleInfo> = vehicles.iter().filter(|v| v.is_idle()).collect();
        vehicles.sort_by(|a, b| a.id.cmp(&b.id));
        vehicles.dedup_by(|a, b| a.id == b.id);
        let mut requesters: Vec<&RequesterInfo> = requesters.iter().filter(|r| r.is_open()).collect();
        requesters.sort_by(|a, b| a.id.cmp(&b.id));
        requesters.dedup_by(|a, b| a.id == b.id);

        let mut pairs = Vec::new();
        for (vi, vehicle) in vehicles.iter().enumerate() {
            for (ri, requester) in requesters.iter().enumerate() {
                let pair = candidate_pair(vehicle, requester, discount, max_pickup_distance);
                if let Some(pair) = pair {
                    pairs.push(CandidatePair {
                        vehicle: vi,
                        requester: ri,
                        ..pair
                    });
                }
            }
        }

        Self {
            vehicle_ids: vehicles.iter().map(|v| v.id.clone()).collect(),
            requester_ids: requesters.iter().map(|r| r.id.clone()).collect(),
            pairs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub(crate) fn assignment_from<I>(&self, matched: I) -> Assignment
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut assignment = Assignment::new();
        for (v, r) in matched {
            assignment.insert(self.vehicle_ids[v].clone(), self.requester_ids[r].clone());
        }
        assignment
    }
}

/// Cost of one pairing, or `None` when the pair is not eligible. Indices are left at 0.
///
/// A pickup farther than `max_pickup_distance` makes the pair ineligible.
pub fn candidate_pair(
    vehicle: &VehicleInfo,
    requester: &RequesterInfo,
    discount: &PriorityDiscount,
    max_pickup_distance: Option<u32>,
) -> Option<CandidatePair> {
    if !vehicle.is_idle() || !requester.is_open() {
        return None;
    }
    if vehicle.available_seats() < requester.party_size {
        return None;
    }
    let pickup_distance = vehicle.position.manhattan(requester.pickup_position);
    if max_pickup_distance.is_some_and(|cap| pickup_distance > cap) {
        return None;
    }
    let cost = pickup_distance as f64 * discount.for_requester(requester);
    if !cost.is_finite() {
        return None;
    }
    Some(CandidatePair {
        vehicle: 0,
        requester: 0,
        pickup_distance,
        cost,
        quantized_cost: (cost * COST_QUANTUM).round() as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridPosition;
    use crate::test_helpers::requester;

    #[test]
    fn pickups_beyond_the_cap_are_not_candidates() {
        let vehicle = VehicleInfo::new("vehicle-000", GridPosition::new(0, 0), 4);
        let discount = PriorityDiscount::default();
        let edge = requester("req-00000", (10, 5), (0, 0));
        let beyond = requester("req-00001", (10, 6), (0, 0));
        assert!(candidate_pair(&vehicle, &edge, &discount, Some(15)).is_some());
        assert!(candidate_pair(&vehicle, &beyond, &discount, Some(15)).is_none());
        assert!(candidate_pair(&vehicle, &beyond, &discount, None).is_some());

        let problem = AssignmentProblem::build(
            std::slice::from_ref(&vehicle),
            &[edge, beyond],
            &discount,
            Some(15),
        );
        assert_eq!(problem.pairs.len(), 1);
        assert_eq!(problem.requester_ids[problem.pairs[0].requester], "req-00000");
    }
}
