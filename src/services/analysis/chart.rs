use rand::Rng;

use super::types::{ChartSeries, ParsedTable, CHART_POINT_LIMIT};
use super::utils::round2;

/// Display series for the dashboard chart.
///
/// The predicted line inflates each actual value by up to 20% and is
/// independent of the predictor's output.
pub fn sample_chart<R: Rng + ?Sized>(table: &ParsedTable, rng: &mut R) -> ChartSeries {
    let points = table.data_rows.min(CHART_POINT_LIMIT);
    let labels = (1..=points).map(|i| format!("Point {}", i)).collect();

    let actual: Vec<f64> = match table.first_numeric() {
        Some((_, values)) => values.iter().take(CHART_POINT_LIMIT).copied().collect(),
        None => (0..points).map(|_| rng.gen::<f64>() * 100.0).collect(),
    };
    let predicted: Vec<f64> = actual
        .iter()
        .map(|v| v * (1.0 + rng.gen::<f64>() * 0.2))
        .collect();

    ChartSeries {
        labels,
        values: actual.into_iter().map(round2).collect(),
        predictions: predicted.into_iter().map(round2).collect(),
    }
}
