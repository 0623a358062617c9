//! Simple pricing for requester fares. The price is informational only; it never
//! influences matching.

use serde::{Deserialize, Serialize};

use crate::ecs::PriorityFlags;
use crate::grid::GridPosition;

/// Base fare in currency units.
pub const BASE_FARE: f64 = 2.50;

/// Rate per grid cell travelled between pickup and dropoff.
pub const PER_CELL_RATE: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub base_fare: f64,
    pub per_cell_rate: f64,
    /// Added once per priority flag set on the requester.
    pub priority_surcharge: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_fare: BASE_FARE,
            per_cell_rate: PER_CELL_RATE,
            priority_surcharge: 0.0,
        }
    }
}

impl PricingConfig {
    /// `fare = base_fare + distance * per_cell_rate + flags * priority_surcharge`
    pub fn quote(&self, pickup: GridPosition, dropoff: GridPosition, priority: PriorityFlags) -> f64 {
        let distance = pickup.manhattan(dropoff) as f64;
        self.base_fare
            + distance * self.per_cell_rate
            + priority.count() as f64 * self.priority_surcharge
    }
}
