use dispatch_core::config::SolverStrategyKind;

use crate::metrics::SweepResult;
use crate::parameters::ParameterSet;

pub(crate) fn export_to_csv_impl(
    results: &[SweepResult],
    parameter_sets: &[ParameterSet],
    file: std::fs::File,
) -> Result<(), Box<dyn std::error::Error>> {
    if results.len() != parameter_sets.len() {
        return Err(format!(
            "Results length ({}) doesn't match parameter_sets length ({})",
            results.len(),
            parameter_sets.len()
        )
        .into());
    }

    let mut wtr = csv::Writer::from_writer(file);

    wtr.write_record([
        "experiment_id",
        "run_id",
        "seed",
        "sensing_radius",
        "diversion_check_interval_ms",
        "solver",
        "fleet_size",
        "ticks",
        "tick_ms",
        "spawned",
        "delivered",
        "waiting_at_end",
        "avg_wait_secs",
        "median_wait_secs",
        "p90_wait_secs",
        "local_claims",
        "global_claims",
        "claim_conflicts",
        "capacity_rejections",
        "solver_passes",
        "greedy_fallbacks",
        "vehicle_faults",
        "deliveries_per_100_ticks",
    ])?;

    for (result, param_set) in results.iter().zip(parameter_sets.iter()) {
        let solver = match param_set.solver {
            SolverStrategyKind::Exact => "Exact",
            SolverStrategyKind::Greedy => "Greedy",
        };

        wtr.write_record([
            param_set.experiment_id.clone(),
            param_set.run_id.to_string(),
            param_set.seed.to_string(),
            param_set.sensing_radius.to_string(),
            param_set.diversion_check_interval_ms.to_string(),
            solver.to_string(),
            param_set.fleet_size.to_string(),
            param_set.ticks.to_string(),
            param_set.tick_ms.to_string(),
            result.spawned.to_string(),
            result.delivered.to_string(),
            result.waiting_at_end.to_string(),
            result.avg_wait_secs.to_string(),
            result.median_wait_secs.to_string(),
            result.p90_wait_secs.to_string(),
            result.local_claims.to_string(),
            result.global_claims.to_string(),
            result.claim_conflicts.to_string(),
            result.capacity_rejections.to_string(),
            result.solver_passes.to_string(),
            result.greedy_fallbacks.to_string(),
            result.vehicle_faults.to_string(),
            result.deliveries_per_100_ticks.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
