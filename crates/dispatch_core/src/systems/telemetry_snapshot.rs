use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::SimulationClock;
use crate::controller::PatrolController;
use crate::ecs::{RequesterInfo, VehicleInfo};
use crate::telemetry::{
    DispatchSnapshot, DispatchSnapshots, DispatchTelemetry, SnapshotConfig, VehicleSnapshot,
};

/// Run condition: the snapshot interval has elapsed.
pub fn snapshot_due(
    clock: Res<SimulationClock>,
    config: Res<SnapshotConfig>,
    snapshots: Res<DispatchSnapshots>,
) -> bool {
    clock.elapsed_since(snapshots.last_snapshot_at, config.interval_ms)
}

pub fn capture_snapshot_system(
    clock: Res<SimulationClock>,
    config: Res<SnapshotConfig>,
    telemetry: Res<DispatchTelemetry>,
    mut snapshots: ResMut<DispatchSnapshots>,
    vehicles: Query<(&VehicleInfo, &PatrolController)>,
    requesters: Query<&RequesterInfo>,
) {
    let snapshot = DispatchSnapshot::build(
        clock.now(),
        clock.tick(),
        vehicles
            .iter()
            .map(|(vehicle, controller)| VehicleSnapshot::new(vehicle, controller.mode()))
            .collect(),
        requesters.iter().cloned().collect(),
        &telemetry,
    );
    snapshots.push(snapshot, config.max_snapshots);
}
