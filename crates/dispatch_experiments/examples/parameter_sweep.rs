//! Sweep sensing radius, solver strategy and fleet size, then export the results.
//!
//! Run with: cargo run -p dispatch_experiments --example parameter_sweep

use dispatch_core::config::SolverStrategyKind;
use dispatch_experiments::{
    export_to_csv, export_to_json, find_best_result_index, run_parameter_sweep, ParameterSpace,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,dispatch_core=warn")).init();

    let space = ParameterSpace::grid()
        .sensing_radius(vec![3.0, 6.0, 10.0])
        .check_interval_ms(vec![1_000, 3_000])
        .solver(vec![SolverStrategyKind::Exact, SolverStrategyKind::Greedy])
        .fleet_size(vec![4, 8])
        .runs_per_combination(2)
        .ticks(900)
        .seed(2024);

    let parameter_sets = space.generate();
    println!("Running {} dispatch runs in parallel...", parameter_sets.len());
    let results = run_parameter_sweep(&parameter_sets, None)?;

    if let Some(best) = find_best_result_index(&results) {
        let params = &parameter_sets[best];
        let result = &results[best];
        println!("\n=== Best Configuration ===");
        println!("Sensing radius: {}", params.sensing_radius);
        println!("Scan interval: {} ms", params.diversion_check_interval_ms);
        println!("Solver: {:?}", params.solver);
        println!("Fleet size: {}", params.fleet_size);
        println!("Deliveries per 100 ticks: {:.2}", result.deliveries_per_100_ticks);
        println!(
            "Wait: avg {:.1}s, median {:.1}s, p90 {:.1}s",
            result.avg_wait_secs, result.median_wait_secs, result.p90_wait_secs
        );
    }

    export_to_csv(&results, &parameter_sets, "dispatch_sweep.csv")?;
    export_to_json(&results, "dispatch_sweep.json")?;
    println!("\nResults exported to dispatch_sweep.csv and dispatch_sweep.json");
    Ok(())
}
