//! Global solver pass over whatever the local scans left unmatched.
//!
//! Runs inside the [`SolverGate`]: a pass that finds the gate taken is skipped, not
//! queued. The gate guard is dropped on every return path.

use bevy_ecs::prelude::{Query, Res, ResMut};
use log::debug;

use crate::clock::SimulationClock;
use crate::controller::PatrolController;
use crate::ecs::{RequesterInfo, VehicleInfo};
use crate::registry::{FleetRoster, RequesterIndex};
use crate::solver::{ConstraintSolverResource, SolverGate};
use crate::telemetry::{ClaimSource, DispatchTelemetry};
use crate::transport::TransportResource;

use super::claims::commit_claim;

#[allow(clippy::too_many_arguments)]
pub fn global_assignment_system(
    clock: Res<SimulationClock>,
    gate: Res<SolverGate>,
    solver: Res<ConstraintSolverResource>,
    transport: Res<TransportResource>,
    roster: Res<FleetRoster>,
    index: Res<RequesterIndex>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut vehicles: Query<(&mut VehicleInfo, &mut PatrolController)>,
    mut requesters: Query<&mut RequesterInfo>,
) {
    let Some(_pass) = gate.try_enter() else {
        telemetry.skipped_passes += 1;
        debug!("solver pass already in flight, skipping");
        return;
    };

    let idle: Vec<VehicleInfo> = vehicles
        .iter()
        .filter(|(vehicle, controller)| vehicle.is_idle() && controller.can_divert())
        .map(|(vehicle, _)| vehicle.clone())
        .collect();
    if idle.is_empty() {
        return;
    }
    let open: Vec<RequesterInfo> = requesters
        .iter()
        .filter(|r| r.is_open())
        .cloned()
        .collect();
    if open.is_empty() {
        return;
    }

    let outcome = solver.solve_detailed(&idle, &open);
    telemetry.solver_passes += 1;
    if outcome.used_fallback() {
        telemetry.greedy_fallbacks += 1;
    }

    let now = clock.now();
    for (vehicle_id, requester_id) in outcome.assignment.pairs() {
        let (Some(vehicle_entity), Some(requester_entity)) =
            (roster.get(vehicle_id), index.get(requester_id))
        else {
            continue;
        };
        let (Ok((mut vehicle, mut controller)), Ok(mut requester)) = (
            vehicles.get_mut(vehicle_entity),
            requesters.get_mut(requester_entity),
        ) else {
            continue;
        };
        commit_claim(
            &mut controller,
            &mut vehicle,
            &mut requester,
            now,
            ClaimSource::Global,
            &mut telemetry,
            transport.0.as_ref(),
        );
    }
}
