use std::time::Duration;

use bevy_ecs::prelude::Resource;

pub const ONE_SEC_MS: u64 = 1000;

/// Tick clock. Simulation time only moves through [`SimulationClock::advance`],
/// which the dispatcher calls once before running the tick schedule.
#[derive(Debug, Default, Clone, Resource)]
pub struct SimulationClock {
    now_ms: u64,
    tick: u64,
    last_dt: Duration,
}

impl SimulationClock {
    /// Current simulation time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Number of ticks advanced so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Length of the tick currently being processed.
    pub fn last_dt(&self) -> Duration {
        self.last_dt
    }

    pub fn last_dt_secs(&self) -> f64 {
        self.last_dt.as_secs_f64()
    }

    pub fn advance(&mut self, dt: Duration) {
        self.now_ms = self.now_ms.saturating_add(dt.as_millis() as u64);
        self.tick += 1;
        self.last_dt = dt;
    }

    /// True when at least `interval_ms` has passed since `last`, or nothing happened yet.
    pub fn elapsed_since(&self, last: Option<u64>, interval_ms: u64) -> bool {
        match last {
            None => true,
            Some(last) => self.now_ms.saturating_sub(last) >= interval_ms,
        }
    }
}
