//! Parameter grid for dispatch sweeps.
//!
//! A [`ParameterSpace`] holds the values to try per dimension; [`ParameterSpace::generate`]
//! expands their Cartesian product into one [`ParameterSet`] per combination and run.

use dispatch_core::config::{DispatchConfig, SolverStrategyKind};
use serde::Serialize;

/// One fully resolved sweep point.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSet {
    /// Unique experiment ID for this parameter combination.
    pub experiment_id: String,
    /// Run ID within the experiment (repeated runs with different seeds).
    pub run_id: usize,
    pub seed: u64,
    pub sensing_radius: f64,
    pub diversion_check_interval_ms: u64,
    pub solver: SolverStrategyKind,
    pub fleet_size: usize,
    /// Ticks of `tick_ms` each run lasts.
    pub ticks: u64,
    pub tick_ms: u64,
    /// Dispatcher config with every swept value applied.
    pub config: DispatchConfig,
}

/// Values to sweep per dimension. An empty dimension keeps the base config's value.
#[derive(Debug, Clone)]
pub struct ParameterSpace {
    sensing_radii: Vec<f64>,
    check_intervals_ms: Vec<u64>,
    solvers: Vec<SolverStrategyKind>,
    fleet_sizes: Vec<usize>,
    runs_per_combination: usize,
    ticks: u64,
    tick_ms: u64,
    base_seed: u64,
    base: DispatchConfig,
}

impl Default for ParameterSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self {
            sensing_radii: Vec::new(),
            check_intervals_ms: Vec::new(),
            solvers: Vec::new(),
            fleet_sizes: Vec::new(),
            runs_per_combination: 1,
            ticks: 600,
            tick_ms: 1_000,
            base_seed: 0,
            base: DispatchConfig::default(),
        }
    }

    /// Start a grid search.
    pub fn grid() -> Self {
        Self::new()
    }

    pub fn sensing_radius(mut self, radii: Vec<f64>) -> Self {
        self.sensing_radii = radii;
        self
    }

    pub fn check_interval_ms(mut self, intervals: Vec<u64>) -> Self {
        self.check_intervals_ms = intervals;
        self
    }

    pub fn solver(mut self, solvers: Vec<SolverStrategyKind>) -> Self {
        self.solvers = solvers;
        self
    }

    pub fn fleet_size(mut self, sizes: Vec<usize>) -> Self {
        self.fleet_sizes = sizes;
        self
    }

    pub fn runs_per_combination(mut self, runs: usize) -> Self {
        self.runs_per_combination = runs.max(1);
        self
    }

    pub fn ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    pub fn with_base(mut self, base: DispatchConfig) -> Self {
        self.base = base;
        self
    }

    /// Number of parameter sets [`generate`](Self::generate) returns.
    pub fn len(&self) -> usize {
        dimension_len(&self.sensing_radii)
            * dimension_len(&self.check_intervals_ms)
            * dimension_len(&self.solvers)
            * dimension_len(&self.fleet_sizes)
            * self.runs_per_combination
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cartesian product of all dimensions, `runs_per_combination` runs each.
    pub fn generate(&self) -> Vec<ParameterSet> {
        let radii = or_base(&self.sensing_radii, self.base.sensing.radius);
        let intervals = or_base(&self.check_intervals_ms, self.base.diversion_check_interval_ms);
        let solvers = or_base(&self.solvers, self.base.solver.strategy);
        let fleets = or_base(&self.fleet_sizes, self.base.vehicle_count);

        let mut sets = Vec::with_capacity(self.len());
        let mut combination = 0usize;
        for &sensing_radius in &radii {
            for &interval in &intervals {
                for &solver in &solvers {
                    for &fleet_size in &fleets {
                        for run_id in 0..self.runs_per_combination {
                            let seed = self
                                .base_seed
                                .wrapping_add((combination as u64).wrapping_mul(0x9e3779b9))
                                .wrapping_add(run_id as u64);
                            let config = self
                                .base
                                .clone()
                                .with_sensing_radius(sensing_radius)
                                .with_diversion_check_interval_ms(interval)
                                .with_solver_strategy(solver)
                                .with_vehicle_count(fleet_size)
                                .with_seed(seed);
                            sets.push(ParameterSet {
                                experiment_id: format!("exp_{combination}"),
                                run_id,
                                seed,
                                sensing_radius,
                                diversion_check_interval_ms: interval,
                                solver,
                                fleet_size,
                                ticks: self.ticks,
                                tick_ms: self.tick_ms,
                                config,
                            });
                        }
                        combination += 1;
                    }
                }
            }
        }
        sets
    }
}

fn dimension_len<T>(values: &[T]) -> usize {
    values.len().max(1)
}

fn or_base<T: Copy>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_expands_cartesian_product() {
        let space = ParameterSpace::grid()
            .sensing_radius(vec![4.0, 8.0])
            .solver(vec![SolverStrategyKind::Exact, SolverStrategyKind::Greedy])
            .fleet_size(vec![2, 4, 6]);
        let sets = space.generate();
        assert_eq!(sets.len(), 12);
        assert_eq!(space.len(), 12);
        assert_eq!(sets[0].experiment_id, "exp_0");
        assert_eq!(sets[11].experiment_id, "exp_11");
        assert!(sets.iter().all(|s| s.config.validate().is_ok()));
        assert_eq!(sets[5].config.vehicle_count, sets[5].fleet_size);
    }

    #[test]
    fn empty_dimensions_keep_base_values() {
        let base = DispatchConfig::default().with_diversion_check_interval_ms(1_500);
        let sets = ParameterSpace::grid().with_base(base).generate();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].diversion_check_interval_ms, 1_500);
        assert_eq!(sets[0].sensing_radius, 6.0);
        assert_eq!(sets[0].solver, SolverStrategyKind::Exact);
    }

    #[test]
    fn repeated_runs_get_distinct_seeds() {
        let sets = ParameterSpace::grid()
            .fleet_size(vec![3])
            .runs_per_combination(3)
            .generate();
        let seeds: std::collections::HashSet<u64> = sets.iter().map(|s| s.seed).collect();
        assert_eq!(sets.len(), 3);
        assert_eq!(seeds.len(), 3);
        assert!(sets.iter().all(|s| s.experiment_id == "exp_0"));
        assert_eq!(sets[2].run_id, 2);
    }
}
