//! Run a six-vehicle patrol fleet for ten simulated minutes and print deliveries.
//!
//! Run with: cargo run -p dispatch_core --example patrol_run

use std::time::Duration;

use dispatch_core::config::{DispatchConfig, SolverStrategyKind};
use dispatch_core::dispatch::DispatchSystem;
use dispatch_core::transport::NullTransport;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    const TICKS: u64 = 600;
    let config = DispatchConfig::default()
        .with_grid(30, 30)
        .with_vehicle_count(6)
        .with_initial_requesters(8)
        .with_solver_strategy(SolverStrategyKind::Exact)
        .with_seed(123);
    let mut system = match DispatchSystem::new(config, Box::new(NullTransport)) {
        Ok(system) => system,
        Err(err) => {
            eprintln!("invalid config: {err}");
            std::process::exit(1);
        }
    };

    system.run_for(TICKS, Duration::from_secs(1));

    let telemetry = system.telemetry();
    println!("--- Patrol run (6 vehicles, 30x30 grid, {TICKS} ticks, seed 123) ---");
    println!("Delivered: {}", telemetry.delivered_count());
    println!("Average wait: {:.1} s", telemetry.average_wait_secs());
    println!(
        "Claims: {} local, {} global, {} conflicts",
        telemetry.local_claims, telemetry.global_claims, telemetry.claim_conflicts
    );
    println!(
        "Solver passes: {} ({} greedy fallbacks, {} skipped)",
        telemetry.solver_passes, telemetry.greedy_fallbacks, telemetry.skipped_passes
    );

    println!();
    println!("{:<12} {:>8} {:>12} {:>8} {:>10} {:>8}", "requester", "vehicle", "wait (s)", "party", "trip (s)", "price");
    for record in telemetry.delivered.iter().take(20) {
        println!(
            "{:<12} {:>8} {:>12.1} {:>8} {:>10} {:>8.2}",
            record.requester_id,
            record.vehicle_id,
            record.wait_secs,
            record.party_size,
            record.trip_duration() / 1000,
            record.price
        );
    }
    if telemetry.delivered.len() > 20 {
        println!("... and {} more", telemetry.delivered.len() - 20);
    }

    println!();
    for snapshot in system.snapshot().vehicles {
        println!(
            "{} at {} in {:?} (load {}/{})",
            snapshot.id, snapshot.position, snapshot.mode, snapshot.current_load, snapshot.capacity
        );
    }
}
