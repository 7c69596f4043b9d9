use super::types::{ParsedTable, StatisticsRecord, STATISTICS_COLUMN_LIMIT};
use super::utils::{mean, population_std_dev, round2};

/// Descriptive statistics for the first five numeric columns.
pub fn compute_statistics(table: &ParsedTable) -> Vec<StatisticsRecord> {
    table
        .numeric_columns
        .iter()
        .take(STATISTICS_COLUMN_LIMIT)
        .filter_map(|name| describe(name, table.column(name)))
        .collect()
}

/// Median takes the upper-middle element for even-length columns.
pub fn describe(name: &str, values: &[f64]) -> Option<StatisticsRecord> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = mean(values);
    let median = sorted[sorted.len() / 2];
    let std_dev = population_std_dev(values, mean);

    Some(StatisticsRecord {
        column: name.to_string(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean: round2(mean),
        median: round2(median),
        std_dev: round2(std_dev),
    })
}
