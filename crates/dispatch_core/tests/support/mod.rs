#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dispatch_core::config::{DispatchConfig, VehicleSpec};
use dispatch_core::controller::ControllerMode;
use dispatch_core::dispatch::DispatchSystem;
use dispatch_core::grid::GridPosition;
use dispatch_core::telemetry::DispatchSnapshot;
use dispatch_core::test_helpers::parked_fleet_config;
use dispatch_core::transport::{BroadcastTransport, NullTransport};

pub const TICK: Duration = Duration::from_secs(1);

/// Builder for small deterministic dispatchers.
#[derive(Clone, Debug)]
pub struct TestDispatchBuilder {
    config: DispatchConfig,
}

impl TestDispatchBuilder {
    /// Vehicles parked on one-waypoint cycles at `starts`, no random requesters.
    pub fn parked(width: i32, height: i32, starts: &[(i32, i32)]) -> Self {
        Self {
            config: parked_fleet_config(width, height, starts),
        }
    }

    pub fn with_fleet(mut self, fleet: Vec<VehicleSpec>) -> Self {
        self.config = self.config.with_fleet(fleet);
        self
    }

    pub fn configure(mut self, f: impl FnOnce(DispatchConfig) -> DispatchConfig) -> Self {
        self.config = f(self.config);
        self
    }

    pub fn build(self) -> DispatchSystem {
        DispatchSystem::new(self.config, Box::new(NullTransport)).expect("dispatcher")
    }

    pub fn build_with_broadcast(self) -> (DispatchSystem, Arc<BroadcastTransport>) {
        let transport = Arc::new(BroadcastTransport::new());
        let system = DispatchSystem::new(self.config, Box::new(Arc::clone(&transport)))
            .expect("dispatcher");
        (system, transport)
    }
}

pub fn pos(x: i32, y: i32) -> GridPosition {
    GridPosition::new(x, y)
}

/// Every live claim is held by exactly one vehicle, and that vehicle holds it back.
pub fn assert_exclusive_claims(snapshot: &DispatchSnapshot) {
    let mut held = std::collections::BTreeSet::new();
    for vehicle in &snapshot.vehicles {
        assert!(
            vehicle.current_load <= vehicle.capacity,
            "{} overloaded at tick {}",
            vehicle.id,
            snapshot.tick
        );
        let on_mission = matches!(
            vehicle.mode,
            ControllerMode::Diverted | ControllerMode::Transporting
        );
        assert_eq!(
            on_mission,
            vehicle.assigned_requester_id.is_some(),
            "{} in {:?} with {:?} at tick {}",
            vehicle.id,
            vehicle.mode,
            vehicle.assigned_requester_id,
            snapshot.tick
        );
        if let Some(requester_id) = &vehicle.assigned_requester_id {
            assert!(
                held.insert(requester_id.clone()),
                "{requester_id} held twice at tick {}",
                snapshot.tick
            );
        }
    }
    for requester in &snapshot.requesters {
        if let Some(owner) = &requester.assigned_vehicle_id {
            let vehicle = snapshot
                .vehicles
                .iter()
                .find(|v| &v.id == owner)
                .expect("owner exists");
            assert_eq!(
                vehicle.assigned_requester_id.as_deref(),
                Some(requester.id.as_str()),
                "{} claims {} at tick {}",
                requester.id,
                owner,
                snapshot.tick
            );
        }
    }
}
