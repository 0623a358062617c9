use std::collections::BTreeSet;

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::grid::GridPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleState {
    Idle,
    Pickup,
    Dropoff,
}

#[derive(Debug, Clone, PartialEq, Eq, Component, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub id: String,
    pub position: GridPosition,
    /// Mission target (pickup or dropoff). Patrol waypoints are the controller's concern.
    pub target_position: Option<GridPosition>,
    pub state: VehicleState,
    pub capacity: u32,
    pub current_load: u32,
    pub assigned_requester_id: Option<String>,
    /// Simulation time (ms) of the last position change or state transition.
    pub last_update: u64,
}

impl VehicleInfo {
    pub fn new(id: impl Into<String>, position: GridPosition, capacity: u32) -> Self {
        Self {
            id: id.into(),
            position,
            target_position: None,
            state: VehicleState::Idle,
            capacity,
            current_load: 0,
            assigned_requester_id: None,
            last_update: 0,
        }
    }

    pub fn available_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.current_load)
    }

    pub fn is_idle(&self) -> bool {
        self.state == VehicleState::Idle
    }

    pub fn ensure_capacity(&self, party_size: u32) -> Result<(), DispatchError> {
        if party_size > self.available_seats() {
            return Err(DispatchError::CapacityExceeded {
                vehicle_id: self.id.clone(),
                party_size,
                available: self.available_seats(),
            });
        }
        Ok(())
    }

    /// Take on a claimed requester: head for its pickup.
    pub(crate) fn begin_pickup(&mut self, requester: &RequesterInfo, now_ms: u64) {
        self.state = VehicleState::Pickup;
        self.assigned_requester_id = Some(requester.id.clone());
        self.target_position = Some(requester.pickup_position);
        self.last_update = now_ms;
    }

    pub(crate) fn board(&mut self, requester: &RequesterInfo, now_ms: u64) {
        self.state = VehicleState::Dropoff;
        self.current_load += requester.party_size;
        self.target_position = Some(requester.dropoff_position);
        self.last_update = now_ms;
    }

    pub(crate) fn unload(&mut self, party_size: u32, now_ms: u64) {
        self.current_load = self.current_load.saturating_sub(party_size);
        self.release(now_ms);
    }

    /// Back to Idle with no mission.
    pub(crate) fn release(&mut self, now_ms: u64) {
        self.state = VehicleState::Idle;
        self.assigned_requester_id = None;
        self.target_position = None;
        self.last_update = now_ms;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequesterState {
    Waiting,
    PickedUp,
    Delivered,
}

/// Priority attributes of a requester. Any subset may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriorityFlags {
    pub disabled: bool,
    pub elderly: bool,
    pub child: bool,
    pub pregnant: bool,
}

impl PriorityFlags {
    pub const NONE: PriorityFlags = PriorityFlags {
        disabled: false,
        elderly: false,
        child: false,
        pregnant: false,
    };

    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::NONE
        }
    }

    pub fn count(&self) -> u32 {
        [self.disabled, self.elderly, self.child, self.pregnant]
            .into_iter()
            .filter(|flag| *flag)
            .count() as u32
    }

    pub fn any(&self) -> bool {
        self.count() > 0
    }

    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.disabled {
            labels.push("DISABLED");
        }
        if self.elderly {
            labels.push("ELDERLY");
        }
        if self.child {
            labels.push("CHILD");
        }
        if self.pregnant {
            labels.push("PREGNANT");
        }
        labels
    }
}

#[derive(Debug, Clone, PartialEq, Component, Serialize, Deserialize)]
pub struct RequesterInfo {
    pub id: String,
    pub pickup_position: GridPosition,
    pub dropoff_position: GridPosition,
    pub state: RequesterState,
    /// Seconds spent waiting; only grows while Waiting.
    pub wait_time: f64,
    pub priority: PriorityFlags,
    pub party_size: u32,
    pub price: f64,
    /// Owner set by a successful claim.
    pub assigned_vehicle_id: Option<String>,
    /// Simulation time (ms) the request entered the registry.
    pub requested_at: u64,
    /// Simulation time (ms) of the successful claim.
    pub claimed_at: Option<u64>,
    /// Simulation time (ms) of pickup.
    pub picked_up_at: Option<u64>,
    /// Vehicles the transport delivered this request to.
    pub reachable_by: BTreeSet<String>,
}

impl RequesterInfo {
    pub fn is_open(&self) -> bool {
        self.state == RequesterState::Waiting && self.assigned_vehicle_id.is_none()
    }

    /// An empty `reachable_by` set places no restriction.
    pub fn reachable_from(&self, vehicle_id: &str) -> bool {
        self.reachable_by.is_empty() || self.reachable_by.contains(vehicle_id)
    }

    /// Compare-and-set claim: succeeds only when the requester is Waiting and unowned.
    /// On failure nothing is modified.
    pub fn try_claim(&mut self, vehicle_id: &str, now_ms: u64) -> Result<(), DispatchError> {
        if !self.is_open() {
            return Err(DispatchError::ClaimConflict {
                requester_id: self.id.clone(),
                vehicle_id: vehicle_id.to_string(),
                holder: self.assigned_vehicle_id.clone(),
            });
        }
        self.assigned_vehicle_id = Some(vehicle_id.to_string());
        self.claimed_at = Some(now_ms);
        Ok(())
    }

    /// Drop an unpicked claim so the requester is open again.
    pub(crate) fn release_claim(&mut self) {
        if self.state == RequesterState::Waiting {
            self.assigned_vehicle_id = None;
            self.claimed_at = None;
        }
    }

    pub(crate) fn mark_picked_up(&mut self, now_ms: u64) {
        debug_assert_eq!(self.state, RequesterState::Waiting);
        self.state = RequesterState::PickedUp;
        self.picked_up_at = Some(now_ms);
    }

    pub(crate) fn mark_delivered(&mut self) {
        debug_assert_eq!(self.state, RequesterState::PickedUp);
        self.state = RequesterState::Delivered;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::requester;

    #[test]
    fn claim_is_compare_and_set() {
        let mut r = requester("req-1", (2, 2), (4, 4));
        r.try_claim("vehicle-a", 10).expect("first claim wins");
        let err = r.try_claim("vehicle-b", 10).expect_err("second claim loses");
        assert_eq!(
            err,
            DispatchError::ClaimConflict {
                requester_id: "req-1".into(),
                vehicle_id: "vehicle-b".into(),
                holder: Some("vehicle-a".into()),
            }
        );
        assert_eq!(r.assigned_vehicle_id.as_deref(), Some("vehicle-a"));
        assert_eq!(r.claimed_at, Some(10));
    }

    #[test]
    fn picked_up_requester_cannot_be_claimed_or_released() {
        let mut r = requester("req-1", (2, 2), (4, 4));
        r.try_claim("vehicle-a", 0).expect("claim");
        r.mark_picked_up(5);
        r.release_claim();
        assert_eq!(r.assigned_vehicle_id.as_deref(), Some("vehicle-a"));
        assert!(r.try_claim("vehicle-b", 6).is_err());
    }

    #[test]
    fn capacity_check_reports_free_seats() {
        let mut v = VehicleInfo::new("vehicle-a", GridPosition::new(0, 0), 4);
        v.current_load = 3;
        assert!(v.ensure_capacity(1).is_ok());
        assert_eq!(
            v.ensure_capacity(2),
            Err(DispatchError::CapacityExceeded {
                vehicle_id: "vehicle-a".into(),
                party_size: 2,
                available: 1,
            })
        );
    }

    #[test]
    fn priority_flags_count_every_set_flag() {
        let flags = PriorityFlags {
            elderly: true,
            pregnant: true,
            ..PriorityFlags::NONE
        };
        assert_eq!(flags.count(), 2);
        assert_eq!(flags.labels(), vec!["ELDERLY", "PREGNANT"]);
        assert!(!PriorityFlags::default().any());
    }
}
