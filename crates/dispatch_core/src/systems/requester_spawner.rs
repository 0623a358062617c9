//! Spawns the random requesters owed by deliveries and the periodic spawn interval.

use bevy_ecs::prelude::{Commands, Res, ResMut};
use log::{info, warn};

use crate::clock::SimulationClock;
use crate::config::DispatchConfig;
use crate::grid::GridNetwork;
use crate::registry::{FleetRoster, RequesterIndex};
use crate::spawner::{admit_requester, random_request, PendingSpawns, SpawnRng};
use crate::telemetry::DispatchTelemetry;
use crate::transport::TransportResource;

#[allow(clippy::too_many_arguments)]
pub fn requester_spawner_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    config: Res<DispatchConfig>,
    grid: Res<GridNetwork>,
    transport: Res<TransportResource>,
    roster: Res<FleetRoster>,
    mut index: ResMut<RequesterIndex>,
    mut spawns: ResMut<PendingSpawns>,
    mut rng: ResMut<SpawnRng>,
    mut telemetry: ResMut<DispatchTelemetry>,
) {
    let now = clock.now();
    let mut count = std::mem::take(&mut spawns.pending);
    if let Some(interval) = config.spawn.spawn_interval_ms {
        if clock.elapsed_since(spawns.last_periodic_at, interval) {
            spawns.last_periodic_at = Some(now);
            count += 1;
        }
    }

    for _ in 0..count {
        let request = random_request(&mut rng.0, &grid, &config.spawn, roster.max_capacity());
        let id = index.next_id();
        match admit_requester(
            &request,
            id,
            now,
            &grid,
            &config.pricing,
            transport.0.as_ref(),
            &roster,
        ) {
            Ok(requester) => {
                info!(
                    "spawned {} at {} -> {} (party {}, {:?})",
                    requester.id,
                    requester.pickup_position,
                    requester.dropoff_position,
                    requester.party_size,
                    requester.priority.labels()
                );
                let id = requester.id.clone();
                let entity = commands.spawn(requester).id();
                index.insert(id, entity);
                telemetry.spawned += 1;
            }
            Err(err) => {
                telemetry.spawn_rejections += 1;
                warn!("random requester rejected: {err}");
            }
        }
    }
}
