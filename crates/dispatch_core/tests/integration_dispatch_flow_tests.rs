mod support;

use dispatch_core::config::DispatchConfig;
use dispatch_core::controller::ControllerMode;
use dispatch_core::dispatch::DispatchSystem;
use dispatch_core::ecs::{RequesterState, VehicleState};
use dispatch_core::spawner::RequesterRequest;
use dispatch_core::telemetry::ClaimSource;
use dispatch_core::transport::NullTransport;
use support::{assert_exclusive_claims, pos, TestDispatchBuilder, TICK};

#[test]
fn nearby_requester_is_claimed_on_first_tick() {
    let mut system = TestDispatchBuilder::parked(5, 5, &[(1, 1)]).build();
    let id = system
        .spawn_requester(RequesterRequest::new((2, 2), (4, 4)))
        .expect("admitted");

    system.update(TICK);

    let requester = system.requester(&id).expect("live");
    assert_eq!(requester.assigned_vehicle_id.as_deref(), Some("vehicle-000"));
    let vehicle = system.vehicle("vehicle-000").expect("vehicle");
    assert_eq!(vehicle.state, VehicleState::Pickup);
    assert_eq!(vehicle.target_position, Some(pos(2, 2)));
    assert_eq!(vehicle.position, pos(2, 1));
    assert_eq!(system.controller_mode("vehicle-000"), Some(ControllerMode::Diverted));
    assert_eq!(system.telemetry().local_claims, 1);

    let path = system.grid().path(pos(1, 1), pos(2, 2)).expect("path");
    assert_eq!(path.len(), 3);
}

#[test]
fn nearest_vehicle_wins_the_requester() {
    let mut system = TestDispatchBuilder::parked(12, 12, &[(0, 0), (10, 10)]).build();
    let id = system
        .spawn_requester(RequesterRequest::new((1, 1), (5, 5)))
        .expect("admitted");

    system.update(TICK);

    let requester = system.requester(&id).expect("live");
    assert_eq!(requester.assigned_vehicle_id.as_deref(), Some("vehicle-000"));
    assert_eq!(system.controller_mode("vehicle-001"), Some(ControllerMode::Cycle));
    assert!(system.vehicle("vehicle-001").expect("vehicle").is_idle());
}

#[test]
fn mission_runs_waiting_picked_up_delivered_then_resumes_own_cycle() {
    let mut system = TestDispatchBuilder::parked(5, 5, &[(1, 1)]).build();
    let id = system
        .spawn_requester(RequesterRequest::new((2, 2), (4, 4)))
        .expect("admitted");

    let mut states = vec![RequesterState::Waiting];
    let mut modes = vec![ControllerMode::Cycle];
    for _ in 0..20 {
        system.update(TICK);
        if let Some(state) = system.requester(&id).map(|r| r.state) {
            if states.last() != Some(&state) {
                states.push(state);
            }
        }
        let mode = system.controller_mode("vehicle-000").expect("mode");
        if modes.last() != Some(&mode) {
            modes.push(mode);
        }
    }

    assert_eq!(states, vec![RequesterState::Waiting, RequesterState::PickedUp]);
    assert!(system.requester(&id).is_none(), "delivered requesters leave the registry");
    assert_eq!(
        modes,
        vec![
            ControllerMode::Cycle,
            ControllerMode::Diverted,
            ControllerMode::Transporting,
            ControllerMode::Resuming,
            ControllerMode::Cycle,
        ]
    );

    let telemetry = system.telemetry();
    assert_eq!(telemetry.delivered_count(), 1);
    let record = &telemetry.delivered[0];
    assert_eq!(record.requester_id, id);
    assert_eq!(record.vehicle_id, "vehicle-000");
    assert_eq!(record.claim_source, ClaimSource::Local);
    assert!(record.claimed_at <= record.picked_up_at);
    assert!(record.picked_up_at < record.delivered_at);
    assert_eq!(record.trip_duration(), 4_000);

    let vehicle = system.vehicle("vehicle-000").expect("vehicle");
    assert_eq!(vehicle.position, pos(1, 1));
    assert_eq!(vehicle.current_load, 0);
    assert!(vehicle.is_idle());
    let controller = system.controller("vehicle-000").expect("controller");
    assert!(controller.cycle().contains(vehicle.position));
}

#[test]
fn claims_stay_exclusive_over_a_long_run() {
    let config = DispatchConfig::default().with_seed(7);
    let mut system = DispatchSystem::new(config, Box::new(NullTransport)).expect("dispatcher");

    for _ in 0..500 {
        system.update(TICK);
        assert_exclusive_claims(&system.snapshot());
    }

    let telemetry = system.telemetry();
    assert!(telemetry.delivered_count() > 0);
    assert_eq!(telemetry.vehicle_faults, 0);
    assert!(telemetry.spawned >= 4);
}

#[test]
fn vehicles_move_at_most_one_cardinal_cell_per_tick() {
    let config = DispatchConfig::default().with_seed(3);
    let mut system = DispatchSystem::new(config, Box::new(NullTransport)).expect("dispatcher");
    let ids = system.vehicle_ids().to_vec();
    let mut last: Vec<_> = ids
        .iter()
        .map(|id| system.vehicle(id).expect("vehicle").position)
        .collect();

    for _ in 0..200 {
        system.update(TICK);
        for (id, previous) in ids.iter().zip(last.iter_mut()) {
            let now = system.vehicle(id).expect("vehicle").position;
            assert!(
                now == *previous || system.grid().neighbors(*previous).contains(&now),
                "{id} jumped from {previous} to {now}"
            );
            *previous = now;
        }
    }
}

#[test]
fn same_seed_replays_the_same_run() {
    let run = || {
        let config = DispatchConfig::default().with_seed(11);
        let mut system =
            DispatchSystem::new(config, Box::new(NullTransport)).expect("dispatcher");
        system.run_for(200, TICK);
        system.snapshot()
    };
    assert_eq!(run(), run());
}
