//! Telemetry / KPIs: delivered trips, event counters and rolling state snapshots.

use std::collections::{HashMap, VecDeque};

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::controller::ControllerMode;
use crate::ecs::{RequesterInfo, RequesterState, VehicleInfo, VehicleState};
use crate::grid::GridPosition;

/// Which decision made the claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimSource {
    /// A vehicle's own opportunity scan.
    Local,
    /// The dispatcher's solver pass.
    Global,
}

/// One delivered requester, recorded at dropoff. Timestamps are simulation ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredRecord {
    pub requester_id: String,
    pub vehicle_id: String,
    pub requested_at: u64,
    pub claimed_at: u64,
    pub picked_up_at: u64,
    pub delivered_at: u64,
    /// Seconds the requester spent Waiting.
    pub wait_secs: f64,
    pub party_size: u32,
    pub price: f64,
    pub priority_flags: u32,
    pub claim_source: ClaimSource,
}

impl DeliveredRecord {
    pub fn time_to_claim(&self) -> u64 {
        self.claimed_at.saturating_sub(self.requested_at)
    }

    pub fn time_to_pickup(&self) -> u64 {
        self.picked_up_at.saturating_sub(self.claimed_at)
    }

    pub fn trip_duration(&self) -> u64 {
        self.delivered_at.saturating_sub(self.picked_up_at)
    }
}

#[derive(Debug, Default, Resource)]
pub struct DispatchTelemetry {
    pub delivered: Vec<DeliveredRecord>,
    pub spawned: u64,
    /// Random requesters the spawner drew but admission refused.
    pub spawn_rejections: u64,
    pub cancelled: u64,
    pub local_claims: u64,
    pub global_claims: u64,
    pub claim_conflicts: u64,
    pub capacity_rejections: u64,
    pub solver_passes: u64,
    pub greedy_fallbacks: u64,
    pub skipped_passes: u64,
    pub vehicle_faults: u64,
    claim_sources: HashMap<String, ClaimSource>,
}

impl DispatchTelemetry {
    pub fn record_claim(&mut self, requester_id: &str, source: ClaimSource) {
        match source {
            ClaimSource::Local => self.local_claims += 1,
            ClaimSource::Global => self.global_claims += 1,
        }
        self.claim_sources.insert(requester_id.to_string(), source);
    }

    /// A claim that was given up before pickup.
    pub fn forget_claim(&mut self, requester_id: &str) {
        self.claim_sources.remove(requester_id);
    }

    pub fn record_delivery(&mut self, requester: &RequesterInfo, vehicle_id: &str, now_ms: u64) {
        let claim_source = self
            .claim_sources
            .remove(&requester.id)
            .unwrap_or(ClaimSource::Global);
        self.delivered.push(DeliveredRecord {
            requester_id: requester.id.clone(),
            vehicle_id: vehicle_id.to_string(),
            requested_at: requester.requested_at,
            claimed_at: requester.claimed_at.unwrap_or(requester.requested_at),
            picked_up_at: requester.picked_up_at.unwrap_or(now_ms),
            delivered_at: now_ms,
            wait_secs: requester.wait_time,
            party_size: requester.party_size,
            price: requester.price,
            priority_flags: requester.priority.count(),
            claim_source,
        });
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }

    /// Mean wait of delivered requesters, 0 when none.
    pub fn average_wait_secs(&self) -> f64 {
        if self.delivered.is_empty() {
            return 0.0;
        }
        self.delivered.iter().map(|r| r.wait_secs).sum::<f64>() / self.delivered.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: String,
    pub position: GridPosition,
    pub target_position: Option<GridPosition>,
    pub state: VehicleState,
    pub mode: ControllerMode,
    pub capacity: u32,
    pub current_load: u32,
    pub assigned_requester_id: Option<String>,
}

impl VehicleSnapshot {
    pub fn new(vehicle: &VehicleInfo, mode: ControllerMode) -> Self {
        Self {
            id: vehicle.id.clone(),
            position: vehicle.position,
            target_position: vehicle.target_position,
            state: vehicle.state,
            mode,
            capacity: vehicle.capacity,
            current_load: vehicle.current_load,
            assigned_requester_id: vehicle.assigned_requester_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub delivered_count: usize,
    pub avg_wait: f64,
    /// Vehicles currently holding a requester.
    pub active_assignments: usize,
    pub waiting_count: usize,
}

/// Read-only view of the whole system at one timestamp. Lists are in id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSnapshot {
    pub timestamp_ms: u64,
    pub tick: u64,
    pub vehicles: Vec<VehicleSnapshot>,
    pub requesters: Vec<RequesterInfo>,
    pub stats: DispatchStats,
}

impl DispatchSnapshot {
    pub fn build(
        timestamp_ms: u64,
        tick: u64,
        mut vehicles: Vec<VehicleSnapshot>,
        mut requesters: Vec<RequesterInfo>,
        telemetry: &DispatchTelemetry,
    ) -> Self {
        vehicles.sort_by(|a, b| a.id.cmp(&b.id));
        requesters.sort_by(|a, b| a.id.cmp(&b.id));
        let stats = DispatchStats {
            delivered_count: telemetry.delivered_count(),
            avg_wait: telemetry.average_wait_secs(),
            active_assignments: vehicles
                .iter()
                .filter(|v| v.assigned_requester_id.is_some())
                .count(),
            waiting_count: requesters
                .iter()
                .filter(|r| r.state == RequesterState::Waiting)
                .count(),
        };
        Self {
            timestamp_ms,
            tick,
            vehicles,
            requesters,
            stats,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Resource)]
pub struct SnapshotConfig {
    pub interval_ms: u64,
    pub max_snapshots: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            max_snapshots: 1_000,
        }
    }
}

/// Rolling snapshot buffer.
#[derive(Debug, Default, Resource)]
pub struct DispatchSnapshots {
    pub snapshots: VecDeque<DispatchSnapshot>,
    pub last_snapshot_at: Option<u64>,
}

impl DispatchSnapshots {
    pub fn push(&mut self, snapshot: DispatchSnapshot, max_snapshots: usize) {
        self.last_snapshot_at = Some(snapshot.timestamp_ms);
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > max_snapshots {
            self.snapshots.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&DispatchSnapshot> {
        self.snapshots.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::requester;

    #[test]
    fn delivery_keeps_claim_source() {
        let mut telemetry = DispatchTelemetry::default();
        let mut r = requester("req-00003", (0, 0), (2, 2));
        r.requested_at = 1_000;
        r.try_claim("vehicle-000", 4_000).expect("claim");
        telemetry.record_claim(&r.id, ClaimSource::Local);
        r.mark_picked_up(6_000);
        r.wait_time = 5.0;
        r.mark_delivered();
        telemetry.record_delivery(&r, "vehicle-000", 9_000);

        let record = &telemetry.delivered[0];
        assert_eq!(record.claim_source, ClaimSource::Local);
        assert_eq!(record.time_to_claim(), 3_000);
        assert_eq!(record.time_to_pickup(), 2_000);
        assert_eq!(record.trip_duration(), 3_000);
        assert_eq!(telemetry.local_claims, 1);
        assert!((telemetry.average_wait_secs() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_buffer_is_capped() {
        let telemetry = DispatchTelemetry::default();
        let mut buffer = DispatchSnapshots::default();
        for t in 0..5 {
            buffer.push(
                DispatchSnapshot::build(t * 100, t, Vec::new(), Vec::new(), &telemetry),
                3,
            );
        }
        assert_eq!(buffer.snapshots.len(), 3);
        assert_eq!(buffer.latest().map(|s| s.timestamp_ms), Some(400));
        assert_eq!(buffer.last_snapshot_at, Some(400));
    }
}
