mod support;

use dispatch_core::config::VehicleSpec;
use dispatch_core::controller::ControllerMode;
use dispatch_core::ecs::PriorityFlags;
use dispatch_core::error::DispatchError;
use dispatch_core::spawner::RequesterRequest;
use support::{pos, TestDispatchBuilder, TICK};

#[test]
fn two_vehicles_racing_for_one_requester_yield_one_claim() {
    let mut system = TestDispatchBuilder::parked(5, 5, &[(0, 2), (4, 2)]).build();
    let id = system
        .spawn_requester(RequesterRequest::new((2, 2), (2, 4)))
        .expect("admitted");

    system.update(TICK);

    let requester = system.requester(&id).expect("live");
    assert_eq!(requester.assigned_vehicle_id.as_deref(), Some("vehicle-000"));
    let telemetry = system.telemetry();
    assert_eq!(telemetry.local_claims, 1);
    assert_eq!(telemetry.global_claims, 0);
    assert_eq!(telemetry.claim_conflicts, 1);

    let loser = system.vehicle("vehicle-001").expect("vehicle");
    assert!(loser.is_idle());
    assert_eq!(loser.assigned_requester_id, None);
    assert_eq!(system.controller_mode("vehicle-001"), Some(ControllerMode::Cycle));
}

#[test]
fn priority_requester_is_preferred_over_a_closer_plain_one() {
    let mut system = TestDispatchBuilder::parked(8, 8, &[(0, 0)]).build();
    let plain = system
        .spawn_requester(RequesterRequest::new((2, 0), (7, 0)))
        .expect("plain");
    let disabled = system
        .spawn_requester(
            RequesterRequest::new((0, 3), (0, 7)).with_priority(PriorityFlags::disabled()),
        )
        .expect("disabled");

    system.update(TICK);

    assert_eq!(
        system.vehicle("vehicle-000").expect("vehicle").assigned_requester_id.as_deref(),
        Some(disabled.as_str())
    );
    assert_eq!(system.requester(&plain).expect("plain").assigned_vehicle_id, None);
}

#[test]
fn party_larger_than_a_vehicle_goes_to_one_that_fits() {
    let mut system = TestDispatchBuilder::parked(10, 10, &[])
        .with_fleet(vec![
            VehicleSpec::at(1, 1)
                .with_cycle(vec![pos(1, 1)])
                .with_capacity(2),
            VehicleSpec::at(5, 1).with_cycle(vec![pos(5, 1)]),
        ])
        .build();
    let id = system
        .spawn_requester(RequesterRequest::new((2, 1), (2, 8)).with_party_size(3))
        .expect("fits the largest vehicle");

    system.update(TICK);

    let requester = system.requester(&id).expect("live");
    assert_eq!(requester.assigned_vehicle_id.as_deref(), Some("vehicle-001"));
    assert!(system.vehicle("vehicle-000").expect("vehicle").is_idle());
    assert_eq!(system.telemetry().capacity_rejections, 0);
}

#[test]
fn requests_no_vehicle_can_serve_are_rejected() {
    let mut system = TestDispatchBuilder::parked(5, 5, &[(0, 0)]).build();

    assert_eq!(
        system.spawn_requester(RequesterRequest::new((1, 1), (3, 3)).with_party_size(5)),
        Err(DispatchError::InvalidPartySize {
            party_size: 5,
            max_capacity: 4,
        })
    );
    assert_eq!(
        system.spawn_requester(RequesterRequest::new((1, 1), (3, 3)).with_party_size(0)),
        Err(DispatchError::InvalidPartySize {
            party_size: 0,
            max_capacity: 4,
        })
    );
    assert_eq!(
        system.spawn_requester(RequesterRequest::new((1, 1), (5, 3))),
        Err(DispatchError::OutOfBounds {
            position: pos(5, 3),
            width: 5,
            height: 5,
        })
    );
    assert_eq!(system.telemetry().spawned, 0);
}

#[test]
fn cancelling_a_claimed_requester_sends_the_vehicle_back_on_patrol() {
    let mut system = TestDispatchBuilder::parked(10, 10, &[(0, 0)]).build();
    let id = system
        .spawn_requester(RequesterRequest::new((5, 5), (9, 9)))
        .expect("admitted");

    system.update(TICK);
    assert_eq!(system.telemetry().global_claims, 1);
    assert_eq!(system.controller_mode("vehicle-000"), Some(ControllerMode::Diverted));

    system.cancel_requester(&id).expect("cancel");

    assert!(system.requester(&id).is_none());
    assert_eq!(system.controller_mode("vehicle-000"), Some(ControllerMode::Cycle));
    let vehicle = system.vehicle("vehicle-000").expect("vehicle");
    assert!(vehicle.is_idle());
    assert_eq!(vehicle.assigned_requester_id, None);
    assert_eq!(vehicle.position, pos(0, 0));
    assert_eq!(system.telemetry().cancelled, 1);
    assert_eq!(
        system.cancel_requester(&id),
        Err(DispatchError::UnknownRequester(id.clone()))
    );

    system.run_for(5, TICK);
    assert_eq!(system.vehicle("vehicle-000").expect("vehicle").position, pos(0, 0));
}

#[test]
fn picked_up_requester_cannot_be_cancelled() {
    let mut system = TestDispatchBuilder::parked(8, 8, &[(0, 0)]).build();
    let id = system
        .spawn_requester(RequesterRequest::new((1, 0), (6, 0)))
        .expect("admitted");

    system.update(TICK);
    assert_eq!(
        system.controller_mode("vehicle-000"),
        Some(ControllerMode::Transporting)
    );

    assert_eq!(
        system.cancel_requester(&id),
        Err(DispatchError::NotCancellable(id.clone()))
    );
    assert!(system.requester(&id).is_some());
    assert_eq!(system.telemetry().cancelled, 0);
}
