use bevy_ecs::prelude::{Query, Res};

use crate::clock::SimulationClock;
use crate::ecs::{RequesterInfo, RequesterState};

/// Waiting requesters accumulate the tick length as wait time.
pub fn wait_time_system(clock: Res<SimulationClock>, mut requesters: Query<&mut RequesterInfo>) {
    let dt = clock.last_dt_secs();
    for mut requester in requesters.iter_mut() {
        if requester.state == RequesterState::Waiting {
            requester.wait_time += dt;
        }
    }
}
