//! Opportunity scan: patrolling vehicles whose scan interval elapsed look for a
//! requester to divert to.
//!
//! Every due vehicle evaluates the same snapshot of open requesters in parallel;
//! the picks are then claimed one at a time in vehicle id order, so two vehicles
//! picking the same requester resolve to exactly one winner.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};
use rayon::prelude::*;

use crate::clock::SimulationClock;
use crate::config::DispatchConfig;
use crate::controller::{select_diversion, PatrolController};
use crate::ecs::{RequesterInfo, VehicleInfo};
use crate::registry::{FleetRoster, RequesterIndex};
use crate::solver::ConstraintSolverResource;
use crate::telemetry::{ClaimSource, DispatchTelemetry};
use crate::transport::TransportResource;

use super::claims::commit_claim;

#[allow(clippy::too_many_arguments)]
pub fn diversion_scan_system(
    clock: Res<SimulationClock>,
    config: Res<DispatchConfig>,
    solver: Res<ConstraintSolverResource>,
    transport: Res<TransportResource>,
    roster: Res<FleetRoster>,
    index: Res<RequesterIndex>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut vehicles: Query<(&mut VehicleInfo, &mut PatrolController)>,
    mut requesters: Query<&mut RequesterInfo>,
) {
    let now = clock.now();
    let interval = config.diversion_check_interval_ms;

    let mut due: Vec<(Entity, VehicleInfo)> = Vec::new();
    for (_, entity) in roster.iter() {
        let Ok((vehicle, mut controller)) = vehicles.get_mut(entity) else {
            continue;
        };
        if vehicle.is_idle() && controller.scan_due(now, interval) {
            controller.mark_scanned(now);
            due.push((entity, vehicle.clone()));
        }
    }
    if due.is_empty() {
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

    let sensing = &config.sensing;
    let solver = &solver.0;
    let picks: Vec<(Entity, String)> = due
        .par_iter()
        .filter_map(|(entity, vehicle)| {
            select_diversion(vehicle, &open, sensing, solver).map(|r| (*entity, r.id.clone()))
        })
        .collect();

    for (vehicle_entity, requester_id) in picks {
        let Some(requester_entity) = index.get(&requester_id) else {
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
            ClaimSource::Local,
            &mut telemetry,
            transport.0.as_ref(),
        );
    }
}
