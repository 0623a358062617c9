//! Claim commit shared by the local scan and the global solver pass.

use log::{debug, info, warn};

use crate::controller::PatrolController;
use crate::ecs::{RequesterInfo, VehicleInfo};
use crate::error::DispatchError;
use crate::telemetry::{ClaimSource, DispatchTelemetry};
use crate::transport::{AcceptanceNotice, DispatchTransport};

/// Try to divert `vehicle` to `requester`. Losing is normal and only counted.
pub(crate) fn commit_claim(
    controller: &mut PatrolController,
    vehicle: &mut VehicleInfo,
    requester: &mut RequesterInfo,
    now_ms: u64,
    source: ClaimSource,
    telemetry: &mut DispatchTelemetry,
    transport: &dyn DispatchTransport,
) -> bool {
    match controller.divert(vehicle, requester, now_ms) {
        Ok(()) => {
            telemetry.record_claim(&requester.id, source);
            let eta_ticks = vehicle.position.manhattan(requester.pickup_position);
            info!(
                "{} claimed {} ({:?}, eta {} ticks)",
                vehicle.id, requester.id, source, eta_ticks
            );
            transport.notify_acceptance(AcceptanceNotice {
                vehicle_id: vehicle.id.clone(),
                requester_id: requester.id.clone(),
                eta_ticks,
                position: vehicle.position,
            });
            true
        }
        Err(err @ DispatchError::ClaimConflict { .. }) => {
            debug!("{err}");
            telemetry.claim_conflicts += 1;
            false
        }
        Err(err @ DispatchError::CapacityExceeded { .. }) => {
            warn!("{err}");
            telemetry.capacity_rejections += 1;
            false
        }
        Err(err) => {
            debug!("claim skipped: {err}");
            false
        }
    }
}
