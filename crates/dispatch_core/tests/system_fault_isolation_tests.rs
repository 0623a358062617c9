mod support;

use dispatch_core::controller::ControllerMode;
use dispatch_core::registry::RequesterIndex;
use dispatch_core::spawner::RequesterRequest;
use support::{pos, TestDispatchBuilder, TICK};

#[test]
fn failing_vehicle_is_recovered_while_the_fleet_keeps_moving() {
    let mut system = TestDispatchBuilder::parked(10, 10, &[(0, 0), (9, 9)]).build();
    let lost = system
        .spawn_requester(RequesterRequest::new((1, 0), (5, 0)))
        .expect("admitted");
    let served = system
        .spawn_requester(RequesterRequest::new((8, 9), (4, 9)))
        .expect("admitted");

    system.update(TICK);
    assert_eq!(
        system.controller_mode("vehicle-000"),
        Some(ControllerMode::Transporting)
    );
    assert_eq!(
        system.controller_mode("vehicle-001"),
        Some(ControllerMode::Transporting)
    );

    // Drop the carried requester's record behind the dispatcher's back.
    let world = system.world_mut();
    let entity = world
        .resource_mut::<RequesterIndex>()
        .remove(&lost)
        .expect("indexed");
    assert!(world.despawn(entity));

    system.run_for(11, TICK);

    let telemetry = system.telemetry();
    assert_eq!(telemetry.vehicle_faults, 1);
    assert_eq!(telemetry.delivered_count(), 1);
    assert_eq!(telemetry.delivered[0].requester_id, served);
    assert_eq!(telemetry.delivered[0].vehicle_id, "vehicle-001");

    let recovered = system.vehicle("vehicle-000").expect("vehicle");
    assert!(recovered.is_idle());
    assert_eq!(recovered.current_load, 0);
    assert_eq!(recovered.position, pos(0, 0));
    assert_eq!(system.controller_mode("vehicle-000"), Some(ControllerMode::Cycle));
    assert_eq!(system.controller_mode("vehicle-001"), Some(ControllerMode::Cycle));
}
