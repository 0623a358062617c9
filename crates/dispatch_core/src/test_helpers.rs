//! Shared setup for unit and integration tests.

use std::collections::BTreeSet;

use crate::config::{DispatchConfig, VehicleSpec};
use crate::ecs::{PriorityFlags, RequesterInfo, RequesterState};
use crate::grid::GridPosition;

/// Waiting, unclaimed single-person requester with no priority flags.
pub fn requester(id: &str, pickup: (i32, i32), dropoff: (i32, i32)) -> RequesterInfo {
    RequesterInfo {
        id: id.to_string(),
        pickup_position: pickup.into(),
        dropoff_position: dropoff.into(),
        state: RequesterState::Waiting,
        wait_time: 0.0,
        priority: PriorityFlags::NONE,
        party_size: 1,
        price: 0.0,
        assigned_vehicle_id: None,
        requested_at: 0,
        claimed_at: None,
        picked_up_at: None,
        reachable_by: BTreeSet::new(),
    }
}

/// Deterministic config: explicit fleet, no random requesters, no respawns.
///
/// Each vehicle patrols a one-waypoint cycle on its start cell, so it stays put
/// until it is diverted.
pub fn parked_fleet_config(width: i32, height: i32, starts: &[(i32, i32)]) -> DispatchConfig {
    let fleet = starts
        .iter()
        .map(|&(x, y)| VehicleSpec::at(x, y).with_cycle(vec![GridPosition::new(x, y)]))
        .collect();
    DispatchConfig::default()
        .with_grid(width, height)
        .with_fleet(fleet)
        .with_initial_requesters(0)
        .with_respawn_on_delivery(false)
}
