use super::types::{
    AnomalyFinding, ParsedTable, Severity, ANOMALY_COLUMN_LIMIT, ANOMALY_FINDING_LIMIT,
};
use super::utils::{display_number, mean, population_std_dev, round1};

const OUTLIER_SIGMA: f64 = 2.5;
const HIGH_SEVERITY_SIGMA: f64 = 3.0;

pub const NO_ANOMALIES: &str = "No significant anomalies detected in the dataset";

/// Severity for a value given its column's mean and population stddev, or
/// `None` when it sits within 2.5 standard deviations.
pub fn classify_deviation(value: f64, mean: f64, std_dev: f64) -> Option<Severity> {
    let deviation = (value - mean).abs();
    if deviation > HIGH_SEVERITY_SIGMA * std_dev {
        Some(Severity::High)
    } else if deviation > OUTLIER_SIGMA * std_dev {
        Some(Severity::Medium)
    } else {
        None
    }
}

/// Scans the first two numeric columns, column by column in row order, and
/// keeps at most three findings overall.
pub fn detect_anomalies(table: &ParsedTable) -> Vec<AnomalyFinding> {
    let mut anomalies = Vec::new();

    for name in table.numeric_columns.iter().take(ANOMALY_COLUMN_LIMIT) {
        let values = table.column(name);
        let mean = mean(values);
        let std_dev = population_std_dev(values, mean);

        for (idx, &value) in values.iter().enumerate() {
            if anomalies.len() >= ANOMALY_FINDING_LIMIT {
                break;
            }
            let Some(severity) = classify_deviation(value, mean, std_dev) else {
                continue;
            };

            let z = (value - mean).abs() / std_dev;
            anomalies.push(AnomalyFinding {
                // Data rows start at line 2, after the header
                description: format!(
                    "Unusual value detected in {} at row {}: {} ({}σ from mean)",
                    name,
                    idx + 2,
                    display_number(value),
                    display_number(round1(z))
                ),
                severity,
                column: Some(name.clone()),
                value: Some(value),
            });
        }
    }

    if anomalies.is_empty() {
        anomalies.push(AnomalyFinding {
            description: NO_ANOMALIES.to_string(),
            severity: Severity::Low,
            column: None,
            value: None,
        });
    }

    anomalies
}
