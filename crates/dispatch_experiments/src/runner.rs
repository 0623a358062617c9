//! Parallel sweep execution using rayon.
//!
//! Every parameter set gets its own [`DispatchSystem`]; runs share nothing.

use std::time::Duration;

use dispatch_core::dispatch::DispatchSystem;
use dispatch_core::error::ConfigError;
use dispatch_core::transport::NullTransport;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;

use crate::metrics::{extract_metrics, SweepResult};
use crate::parameters::ParameterSet;

/// Run one parameter set for its configured number of ticks.
pub fn run_single(param_set: &ParameterSet) -> Result<SweepResult, ConfigError> {
    let mut system = DispatchSystem::new(param_set.config.clone(), Box::new(NullTransport))?;
    system.run_for(param_set.ticks, Duration::from_millis(param_set.tick_ms));
    let result = extract_metrics(&system, param_set);
    info!(
        "{} run {}: {} delivered, avg wait {:.1}s",
        param_set.experiment_id, param_set.run_id, result.delivered, result.avg_wait_secs
    );
    Ok(result)
}

/// Run every parameter set in parallel, with a progress bar.
///
/// Results come back in input order. `num_threads` of `None` uses rayon's default.
pub fn run_parameter_sweep(
    parameter_sets: &[ParameterSet],
    num_threads: Option<usize>,
) -> Result<Vec<SweepResult>, Box<dyn std::error::Error>> {
    run_parameter_sweep_with_progress(parameter_sets, num_threads, true)
}

pub fn run_parameter_sweep_with_progress(
    parameter_sets: &[ParameterSet],
    num_threads: Option<usize>,
    show_progress: bool,
) -> Result<Vec<SweepResult>, Box<dyn std::error::Error>> {
    let total = parameter_sets.len();
    let pb = if show_progress && total > 0 {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Some(bar)
    } else {
        None
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = num_threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build()?;

    let results: Result<Vec<SweepResult>, ConfigError> = pool.install(|| {
        parameter_sets
            .par_iter()
            .map(|param_set| {
                let result = run_single(param_set);
                if let Some(progress_bar) = &pb {
                    progress_bar.inc(1);
                }
                result
            })
            .collect()
    });

    if let Some(progress_bar) = &pb {
        progress_bar.finish_with_message("Completed");
    }

    results.map_err(Into::into)
}
