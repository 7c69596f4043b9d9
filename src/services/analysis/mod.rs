//! Statistics pipeline run over an uploaded table.
//!
//! Parsing feeds statistics, trend, prediction and anomaly passes, whose
//! output is summarized into insight strings and a chart series. All
//! jittered fields draw from the caller's RNG.

pub mod anomalies;
pub mod chart;
pub mod insights;
pub mod parser;
pub mod predictor;
pub mod statistics;
pub mod trends;
pub mod types;
pub mod utils;

use rand::Rng;

pub use types::*;

pub fn analyze<R: Rng + ?Sized>(
    raw_content: &str,
    declared_columns: &[String],
    rng: &mut R,
) -> AnalysisResult {
    let start = std::time::Instant::now();
    let table = parser::parse(raw_content, declared_columns);
    let total_columns = declared_columns.len();

    let statistics = statistics::compute_statistics(&table);
    let trends = trends::detect_trends(&table, total_columns, rng);
    let predictions = predictor::predict(&table, rng);
    let anomalies = anomalies::detect_anomalies(&table);
    let insights = insights::synthesize(&table, total_columns, &predictions, rng);
    let chart_data = chart::sample_chart(&table, rng);

    tracing::info!(
        "Analyzed {} rows ({} numeric of {} columns) in {:?}",
        table.data_rows,
        table.numeric_columns.len(),
        total_columns,
        start.elapsed()
    );

    AnalysisResult {
        summary: AnalysisSummary {
            total_rows: table.data_rows,
            total_columns,
            numeric_columns: table.numeric_columns.len(),
            categorical_columns: total_columns.saturating_sub(table.numeric_columns.len()),
        },
        statistics,
        trends,
        predictions,
        anomalies,
        insights,
        chart_data,
    }
}
