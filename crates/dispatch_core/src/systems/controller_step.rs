//! Advance every vehicle's state machine by one step, in vehicle id order.
//!
//! A failing vehicle is logged, counted and recovered; the others still move.
//! Delivered requesters are despawned here and recorded in telemetry.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use log::{debug, error, info};

use crate::clock::SimulationClock;
use crate::config::DispatchConfig;
use crate::controller::{PatrolController, StepEvent};
use crate::ecs::{RequesterInfo, VehicleInfo};
use crate::grid::GridNetwork;
use crate::registry::{FleetRoster, RequesterIndex};
use crate::spawner::PendingSpawns;
use crate::telemetry::DispatchTelemetry;

#[allow(clippy::too_many_arguments)]
pub fn controller_step_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    config: Res<DispatchConfig>,
    grid: Res<GridNetwork>,
    roster: Res<FleetRoster>,
    mut index: ResMut<RequesterIndex>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut spawns: ResMut<PendingSpawns>,
    mut vehicles: Query<(&mut VehicleInfo, &mut PatrolController)>,
    mut requesters: Query<&mut RequesterInfo>,
) {
    let now = clock.now();

    for (_, vehicle_entity) in roster.iter() {
        let Ok((mut vehicle, mut controller)) = vehicles.get_mut(vehicle_entity) else {
            continue;
        };
        let requester_entity = vehicle
            .assigned_requester_id
            .as_deref()
            .and_then(|id| index.get(id));
        let mut requester = requester_entity.and_then(|e| requesters.get_mut(e).ok());

        match controller.step(&mut vehicle, requester.as_deref_mut(), &grid, now) {
            Ok(report) => match report.event {
                Some(StepEvent::PickedUp { requester_id }) => {
                    info!("{} picked up {} at {}", vehicle.id, requester_id, vehicle.position);
                }
                Some(StepEvent::Delivered { requester_id }) => {
                    if let Some(r) = requester.as_deref() {
                        telemetry.record_delivery(r, &vehicle.id, now);
                    }
                    if let Some(entity) = index.remove(&requester_id) {
                        commands.entity(entity).despawn();
                    }
                    if config.spawn.respawn_on_delivery {
                        spawns.pending += 1;
                    }
                    info!(
                        "{} delivered {} at {}, resuming patrol",
                        vehicle.id, requester_id, vehicle.position
                    );
                }
                Some(StepEvent::Unwound { requester_id }) => {
                    if let Some(id) = requester_id.as_deref() {
                        telemetry.forget_claim(id);
                    }
                    info!("{} gave up {:?}, back on patrol", vehicle.id, requester_id);
                }
                Some(StepEvent::Rejoined { waypoint_index }) => {
                    debug!("{} rejoined its cycle at waypoint {}", vehicle.id, waypoint_index);
                }
                None => {}
            },
            Err(err) => {
                error!("vehicle {} step failed: {err}", vehicle.id);
                telemetry.vehicle_faults += 1;
                let held = vehicle.assigned_requester_id.clone();
                controller.recover(&mut vehicle, requester.as_deref_mut(), now);
                if let (Some(id), None) = (held, vehicle.assigned_requester_id.as_ref()) {
                    telemetry.forget_claim(&id);
                }
            }
        }
    }
}
