//! Metrics extraction from finished dispatch runs.

use dispatch_core::dispatch::DispatchSystem;
use serde::Serialize;

use crate::parameters::ParameterSet;

/// Aggregated metrics from a single sweep run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub experiment_id: String,
    pub run_id: usize,
    pub ticks: u64,
    pub fleet_size: usize,
    /// Requesters that entered the registry, including the initial ones.
    pub spawned: u64,
    pub delivered: usize,
    /// Requesters still Waiting when the run ended.
    pub waiting_at_end: usize,
    pub avg_wait_secs: f64,
    pub median_wait_secs: f64,
    pub p90_wait_secs: f64,
    pub local_claims: u64,
    pub global_claims: u64,
    pub claim_conflicts: u64,
    pub capacity_rejections: u64,
    pub solver_passes: u64,
    pub greedy_fallbacks: u64,
    pub vehicle_faults: u64,
    pub deliveries_per_100_ticks: f64,
}

impl SweepResult {
    /// Average, median and p90 of `values`; zeros when empty.
    fn calculate_stats(values: &[f64]) -> (f64, f64, f64) {
        if values.is_empty() {
            return (0.0, 0.0, 0.0);
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let avg = sorted.iter().sum::<f64>() / sorted.len() as f64;
        let median = if sorted.len() % 2 == 0 {
            (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
        } else {
            sorted[sorted.len() / 2]
        };
        // floor(0.9 * (n - 1))
        let p90_idx = ((sorted.len() - 1) as f64 * 0.9) as usize;
        let p90 = sorted[p90_idx.min(sorted.len() - 1)];

        (avg, median, p90)
    }
}

pub fn extract_metrics(system: &DispatchSystem, param_set: &ParameterSet) -> SweepResult {
    let telemetry = system.telemetry();
    let waits: Vec<f64> = telemetry.delivered.iter().map(|r| r.wait_secs).collect();
    let (avg_wait_secs, median_wait_secs, p90_wait_secs) = SweepResult::calculate_stats(&waits);
    let ticks = system.tick();
    let deliveries_per_100_ticks = if ticks == 0 {
        0.0
    } else {
        waits.len() as f64 * 100.0 / ticks as f64
    };

    SweepResult {
        experiment_id: param_set.experiment_id.clone(),
        run_id: param_set.run_id,
        ticks,
        fleet_size: system.vehicle_ids().len(),
        spawned: telemetry.spawned,
        delivered: waits.len(),
        waiting_at_end: system.snapshot().stats.waiting_count,
        avg_wait_secs,
        median_wait_secs,
        p90_wait_secs,
        local_claims: telemetry.local_claims,
        global_claims: telemetry.global_claims,
        claim_conflicts: telemetry.claim_conflicts,
        capacity_rejections: telemetry.capacity_rejections,
        solver_passes: telemetry.solver_passes,
        greedy_fallbacks: telemetry.greedy_fallbacks,
        vehicle_faults: telemetry.vehicle_faults,
        deliveries_per_100_ticks,
    }
}
