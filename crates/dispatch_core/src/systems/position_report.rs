use bevy_ecs::prelude::{Query, Res};

use crate::clock::SimulationClock;
use crate::ecs::VehicleInfo;
use crate::registry::FleetRoster;
use crate::transport::{PositionReport, TransportResource};

/// One position report per vehicle per tick, in vehicle id order.
pub fn position_report_system(
    clock: Res<SimulationClock>,
    transport: Res<TransportResource>,
    roster: Res<FleetRoster>,
    vehicles: Query<&VehicleInfo>,
) {
    for (_, entity) in roster.iter() {
        if let Ok(vehicle) = vehicles.get(entity) {
            transport.report_position(PositionReport {
                vehicle_id: vehicle.id.clone(),
                position: vehicle.position,
                timestamp_ms: clock.now(),
            });
        }
    }
}
