//! Result export to CSV and JSON.

use std::path::Path;

use crate::metrics::SweepResult;
use crate::parameters::ParameterSet;

#[path = "export/csv.rs"]
mod csv;
#[path = "export/json.rs"]
mod json;
#[path = "export/writer_utils.rs"]
mod writer_utils;

/// Export sweep results to a JSON array.
pub fn export_to_json(
    results: &[SweepResult],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = writer_utils::create_output_file(path)?;
    json::export_to_json_impl(results, file)
}

/// Export results paired with their parameter sets (by index) to CSV.
///
/// # Errors
///
/// Returns an error if there is nothing to export, the lengths differ, or writing fails.
pub fn export_to_csv(
    results: &[SweepResult],
    parameter_sets: &[ParameterSet],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    writer_utils::ensure_not_empty(results)?;
    let file = writer_utils::create_output_file(path)?;
    csv::export_to_csv_impl(results, parameter_sets, file)
}

/// Index of the result with the most deliveries per 100 ticks; ties go to the lower
/// average wait.
pub fn find_best_result_index(results: &[SweepResult]) -> Option<usize> {
    results
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.deliveries_per_100_ticks
                .total_cmp(&b.deliveries_per_100_ticks)
                .then_with(|| b.avg_wait_secs.total_cmp(&a.avg_wait_secs))
        })
        .map(|(index, _)| index)
}
