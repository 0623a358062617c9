//! Parallel parameter sweeps over the patrol dispatcher.
//!
//! Runs many independent `DispatchSystem`s with varying sensing radius, scan interval,
//! solver strategy and fleet size, then extracts per-run metrics for comparison.
//!
//! # Quick Start
//!
//! ```no_run
//! use dispatch_core::config::SolverStrategyKind;
//! use dispatch_experiments::{export_to_csv, run_parameter_sweep, ParameterSpace};
//!
//! let space = ParameterSpace::grid()
//!     .sensing_radius(vec![4.0, 6.0, 8.0])
//!     .solver(vec![SolverStrategyKind::Exact, SolverStrategyKind::Greedy])
//!     .fleet_size(vec![4, 8]);
//! let sets = space.generate();
//! let results = run_parameter_sweep(&sets, None).unwrap();
//! export_to_csv(&results, &sets, "sweep.csv").unwrap();
//! ```
//!
//! - [`parameters`]: parameter grid
//! - [`runner`]: parallel execution using rayon
//! - [`metrics`]: per-run metrics
//! - [`export`]: CSV/JSON export and ranking

pub mod export;
pub mod metrics;
pub mod parameters;
pub mod runner;

pub use export::{export_to_csv, export_to_json, find_best_result_index};
pub use metrics::SweepResult;
pub use parameters::{ParameterSet, ParameterSpace};
pub use runner::{run_parameter_sweep, run_single};
