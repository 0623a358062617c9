//! Requester creation: validated explicit requests and random generation.
//!
//! Both paths go through [`admit_requester`], which validates positions and party
//! size, prices the trip and asks the transport which vehicles the request reached.

use std::collections::BTreeSet;

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::RequesterSpawnConfig;
use crate::ecs::{PriorityFlags, RequesterInfo, RequesterState};
use crate::error::DispatchError;
use crate::grid::{GridNetwork, GridPosition};
use crate::pricing::PricingConfig;
use crate::registry::FleetRoster;
use crate::transport::DispatchTransport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterRequest {
    pub pickup: GridPosition,
    pub dropoff: GridPosition,
    pub party_size: u32,
    pub priority: PriorityFlags,
}

impl RequesterRequest {
    pub fn new(pickup: impl Into<GridPosition>, dropoff: impl Into<GridPosition>) -> Self {
        Self {
            pickup: pickup.into(),
            dropoff: dropoff.into(),
            party_size: 1,
            priority: PriorityFlags::NONE,
        }
    }

    pub fn with_party_size(mut self, party_size: u32) -> Self {
        self.party_size = party_size;
        self
    }

    pub fn with_priority(mut self, priority: PriorityFlags) -> Self {
        self.priority = priority;
        self
    }
}

/// Seeded RNG for random requesters, so runs are reproducible.
#[derive(Debug, Resource)]
pub struct SpawnRng(pub StdRng);

impl SpawnRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

/// Random requesters owed to the spawner system.
#[derive(Debug, Default, Resource)]
pub struct PendingSpawns {
    /// One per delivery when respawn-on-delivery is on.
    pub pending: u32,
    pub last_periodic_at: Option<u64>,
}

/// Random trip: dropoff at least `min_trip_distance` away when the grid allows it
/// within `placement_attempts` tries; at most one priority flag.
pub fn random_request<R: Rng + ?Sized>(
    rng: &mut R,
    grid: &GridNetwork,
    config: &RequesterSpawnConfig,
    max_capacity: u32,
) -> RequesterRequest {
    let pickup = grid.random_position(rng);
    let mut dropoff = grid.random_position(rng);
    for _ in 1..config.placement_attempts.max(1) {
        if pickup.manhattan(dropoff) >= config.min_trip_distance {
            break;
        }
        dropoff = grid.random_position(rng);
    }

    let max_party = config.max_party_size.min(max_capacity).max(1);
    let party_size = rng.gen_range(1..=max_party);

    let mut priority = PriorityFlags::NONE;
    if rng.gen_bool(config.disabled_probability) {
        priority.disabled = true;
    } else if rng.gen_bool(config.elderly_probability) {
        priority.elderly = true;
    } else if rng.gen_bool(config.child_probability) {
        priority.child = true;
    } else if rng.gen_bool(config.pregnant_probability) {
        priority.pregnant = true;
    }

    RequesterRequest {
        pickup,
        dropoff,
        party_size,
        priority,
    }
}

/// Build the Waiting requester for `request`, or reject it.
pub fn admit_requester(
    request: &RequesterRequest,
    id: String,
    now_ms: u64,
    grid: &GridNetwork,
    pricing: &PricingConfig,
    transport: &dyn DispatchTransport,
    roster: &FleetRoster,
) -> Result<RequesterInfo, DispatchError> {
    let pickup_position = grid.validate(request.pickup)?;
    let dropoff_position = grid.validate(request.dropoff)?;
    if request.party_size == 0 || request.party_size > roster.max_capacity() {
        return Err(DispatchError::InvalidPartySize {
            party_size: request.party_size,
            max_capacity: roster.max_capacity(),
        });
    }

    let mut requester = RequesterInfo {
        id,
        pickup_position,
        dropoff_position,
        state: RequesterState::Waiting,
        wait_time: 0.0,
        priority: request.priority,
        party_size: request.party_size,
        price: pricing.quote(pickup_position, dropoff_position, request.priority),
        assigned_vehicle_id: None,
        requested_at: now_ms,
        claimed_at: None,
        picked_up_at: None,
        reachable_by: BTreeSet::new(),
    };
    requester.reachable_by = transport.deliver_request(&requester, roster.ids());
    Ok(requester)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::NullTransport;
    use bevy_ecs::world::World;

    fn roster(capacity: u32) -> FleetRoster {
        let mut world = World::new();
        let mut roster = FleetRoster::default();
        roster.insert("vehicle-000".into(), world.spawn_empty().id(), capacity);
        roster
    }

    #[test]
    fn random_requests_respect_bounds_and_separation() {
        let grid = GridNetwork::new(20, 20).expect("grid");
        let config = RequesterSpawnConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let request = random_request(&mut rng, &grid, &config, 2);
            assert!(grid.contains(request.pickup));
            assert!(grid.contains(request.dropoff));
            assert!((1..=2).contains(&request.party_size));
            assert!(request.priority.count() <= 1);
        }
    }

    #[test]
    fn admission_validates_and_prices() {
        let grid = GridNetwork::new(5, 5).expect("grid");
        let pricing = PricingConfig::default();
        let roster = roster(4);
        let ok = admit_requester(
            &RequesterRequest::new((2, 2), (4, 4)),
            "req-00000".into(),
            500,
            &grid,
            &pricing,
            &NullTransport,
            &roster,
        )
        .expect("valid request");
        assert_eq!(ok.state, RequesterState::Waiting);
        assert_eq!(ok.requested_at, 500);
        assert!(ok.reachable_from("vehicle-000"));
        assert!(ok.price > pricing.base_fare);

        let out = admit_requester(
            &RequesterRequest::new((2, 2), (5, 1)),
            "req-00001".into(),
            0,
            &grid,
            &pricing,
            &NullTransport,
            &roster,
        );
        assert!(matches!(out, Err(DispatchError::OutOfBounds { .. })));

        let too_big = admit_requester(
            &RequesterRequest::new((0, 0), (1, 1)).with_party_size(5),
            "req-00002".into(),
            0,
            &grid,
            &pricing,
            &NullTransport,
            &roster,
        );
        assert_eq!(
            too_big,
            Err(DispatchError::InvalidPartySize {
                party_size: 5,
                max_capacity: 4
            })
        );
    }
}
