//! Tick runner: advances the clock outside the schedule, then runs the systems.
//!
//! One tick, in order:
//!
//! 1. opportunity scans and every controller step (scan, claim, move, arrivals)
//! 2. wait time for every Waiting requester
//! 3. one global solver pass over what is still unmatched, committed claim by claim
//! 4. respawns, position reports and the periodic snapshot

use std::time::Duration;

use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::SimulationClock;
use crate::systems::{
    controller_step::controller_step_system,
    diversion_scan::diversion_scan_system,
    global_assignment::global_assignment_system,
    position_report::position_report_system,
    requester_spawner::requester_spawner_system,
    telemetry_snapshot::{capture_snapshot_system, snapshot_due},
    wait_time::wait_time_system,
};

pub fn dispatch_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            diversion_scan_system,
            controller_step_system,
            // Delivered requesters are gone before anyone counts or matches them.
            apply_deferred,
            wait_time_system,
            global_assignment_system,
            requester_spawner_system,
            apply_deferred,
            position_report_system,
            capture_snapshot_system.run_if(snapshot_due),
        )
            .chain(),
    );
    schedule
}

/// Advance the clock by `dt` and run one tick.
pub fn run_tick(world: &mut World, schedule: &mut Schedule, dt: Duration) {
    world.resource_mut::<SimulationClock>().advance(dt);
    schedule.run(world);
}
