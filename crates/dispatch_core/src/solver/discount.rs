use serde::{Deserialize, Serialize};

use crate::ecs::{PriorityFlags, RequesterInfo};

/// Discount applied to a pair's pickup distance. Lower factor = cheaper to serve.
///
/// `flag_factor = 1 / (1 + flag_weight * flags)`
/// `wait_factor = 1` up to `wait_grace_secs`, then falls linearly over
/// `wait_horizon_secs` and stops at `wait_floor`.
/// The discount is `flag_factor * wait_factor`: non-increasing in both wait time and
/// flag count, below 1 whenever any flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityDiscount {
    pub flag_weight: f64,
    pub wait_grace_secs: f64,
    pub wait_horizon_secs: f64,
    pub wait_floor: f64,
}

impl Default for PriorityDiscount {
    fn default() -> Self {
        Self {
            flag_weight: 1.0,
            wait_grace_secs: 30.0,
            wait_horizon_secs: 180.0,
            wait_floor: 0.1,
        }
    }
}

impl PriorityDiscount {
    pub fn flag_factor(&self, flags: PriorityFlags) -> f64 {
        1.0 / (1.0 + self.flag_weight.max(0.0) * flags.count() as f64)
    }

    pub fn wait_factor(&self, wait_secs: f64) -> f64 {
        let overdue = wait_secs - self.wait_grace_secs;
        if overdue <= 0.0 {
            return 1.0;
        }
        let horizon = self.wait_horizon_secs.max(f64::EPSILON);
        (1.0 - overdue / horizon).max(self.wait_floor).min(1.0)
    }

    pub fn factor(&self, flags: PriorityFlags, wait_secs: f64) -> f64 {
        self.flag_factor(flags) * self.wait_factor(wait_secs)
    }

    pub fn for_requester(&self, requester: &RequesterInfo) -> f64 {
        self.factor(requester.priority, requester.wait_time)
    }
}
