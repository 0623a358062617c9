mod support;

use dispatch_core::ecs::RequesterState;
use dispatch_core::registry::requester_id;
use support::{TestDispatchBuilder, TICK};

#[test]
fn periodic_spawns_follow_the_configured_interval() {
    let mut system = TestDispatchBuilder::parked(20, 20, &[(0, 0)])
        .configure(|mut config| {
            config.spawn.spawn_interval_ms = Some(3_000);
            config
        })
        .build();
    let min_trip = system.config().spawn.min_trip_distance;

    let mut spawned = Vec::new();
    for _ in 0..9 {
        system.update(TICK);
        let count = system.telemetry().spawned;
        if spawned.last() != Some(&count) && count > 0 {
            let requester = system
                .requester(&requester_id(count - 1))
                .expect("freshly spawned requester is live");
            assert_eq!(requester.requested_at, system.now_ms());
            assert_eq!(requester.state, RequesterState::Waiting);
            assert!(system.grid().contains(requester.pickup_position));
            assert!(system.grid().contains(requester.dropoff_position));
            assert!(
                requester.pickup_position.manhattan(requester.dropoff_position) >= min_trip,
                "{} -> {} is too short",
                requester.pickup_position,
                requester.dropoff_position
            );
            assert!(requester.party_size >= 1);
        }
        spawned.push(count);
    }
    assert_eq!(spawned, vec![0, 0, 1, 1, 1, 2, 2, 2, 3]);
    assert_eq!(system.telemetry().spawn_rejections, 0);
}

#[test]
fn rejected_spawns_are_counted_and_ticks_continue() {
    // No vehicles means no party size fits, so every draw is refused.
    let mut system = TestDispatchBuilder::parked(6, 6, &[])
        .configure(|mut config| {
            config.spawn.spawn_interval_ms = Some(2_000);
            config
        })
        .build();

    system.run_for(6, TICK);

    assert_eq!(system.tick(), 6);
    assert_eq!(system.now_ms(), 6_000);
    let telemetry = system.telemetry();
    assert_eq!(telemetry.spawn_rejections, 3);
    assert_eq!(telemetry.spawned, 0);
    assert!(system.snapshot().requesters.is_empty());
}
