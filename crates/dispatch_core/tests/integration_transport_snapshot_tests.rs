mod support;

use std::collections::BTreeSet;

use dispatch_core::controller::ControllerMode;
use dispatch_core::spawner::RequesterRequest;
use dispatch_core::telemetry::SnapshotConfig;
use support::{pos, TestDispatchBuilder, TICK};

#[test]
fn broadcast_reaches_fleet_and_records_acceptances() {
    let (mut system, transport) =
        TestDispatchBuilder::parked(6, 6, &[(0, 0), (5, 5)]).build_with_broadcast();
    let id = system
        .spawn_requester(RequesterRequest::new((0, 2), (0, 5)))
        .expect("admitted");

    let deliveries = transport.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, id);
    let fleet: BTreeSet<String> = ["vehicle-000", "vehicle-001"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(deliveries[0].1, fleet);
    assert_eq!(system.requester(&id).expect("live").reachable_by, fleet);

    system.update(TICK);

    let acceptances = transport.acceptances();
    assert_eq!(acceptances.len(), 1);
    assert_eq!(acceptances[0].vehicle_id, "vehicle-000");
    assert_eq!(acceptances[0].requester_id, id);
    assert_eq!(acceptances[0].eta_ticks, 2);
    assert_eq!(acceptances[0].position, pos(0, 0));

    let positions = transport.positions();
    assert_eq!(positions.len(), 2);
    assert!(positions.iter().all(|r| r.timestamp_ms == 1_000));
    assert_eq!(transport.last_position("vehicle-000"), Some(pos(0, 1)));
    assert_eq!(transport.last_position("vehicle-001"), Some(pos(5, 5)));
}

#[test]
fn snapshots_follow_interval_and_cap() {
    let mut system = TestDispatchBuilder::parked(6, 6, &[(0, 0)])
        .configure(|config| {
            config.with_snapshots(SnapshotConfig {
                interval_ms: 2_000,
                max_snapshots: 2,
            })
        })
        .build();
    system
        .spawn_requester(RequesterRequest::new((3, 0), (3, 5)))
        .expect("admitted");

    system.run_for(6, TICK);

    let snapshots = system.snapshots();
    assert_eq!(snapshots.snapshots.len(), 2);
    let ticks: Vec<u64> = snapshots.snapshots.iter().map(|s| s.tick).collect();
    assert_eq!(ticks, vec![3, 5]);
    assert_eq!(snapshots.last_snapshot_at, Some(5_000));
}

#[test]
fn snapshot_reports_modes_and_stats() {
    let mut system = TestDispatchBuilder::parked(6, 6, &[(0, 0), (5, 5)]).build();
    system
        .spawn_requester(RequesterRequest::new((0, 2), (0, 5)))
        .expect("admitted");
    system
        .spawn_requester(RequesterRequest::new((5, 0), (0, 0)))
        .expect("admitted");

    system.update(TICK);
    let snapshot = system.snapshot();

    assert_eq!(snapshot.tick, 1);
    assert_eq!(snapshot.timestamp_ms, 1_000);
    let ids: Vec<&str> = snapshot.vehicles.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["vehicle-000", "vehicle-001"]);
    assert!(snapshot
        .vehicles
        .iter()
        .all(|v| v.mode == ControllerMode::Diverted));
    assert_eq!(snapshot.stats.active_assignments, 2);
    assert_eq!(snapshot.stats.waiting_count, 2);
    assert_eq!(snapshot.stats.delivered_count, 0);
}
