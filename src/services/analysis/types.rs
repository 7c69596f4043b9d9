use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

pub const STATISTICS_COLUMN_LIMIT: usize = 5;
pub const PREDICTION_COLUMN_LIMIT: usize = 3;
pub const ANOMALY_COLUMN_LIMIT: usize = 2;
pub const ANOMALY_FINDING_LIMIT: usize = 3;
pub const CHART_POINT_LIMIT: usize = 12;

/// Numeric view of an uploaded table. Columns that failed the numeric
/// threshold are absent from `values` and `numeric_columns`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTable {
    pub data_rows: usize,
    pub values: HashMap<String, Vec<f64>>,
    pub numeric_columns: Vec<String>,
}

impl ParsedTable {
    pub fn column(&self, name: &str) -> &[f64] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first_numeric(&self) -> Option<(&str, &[f64])> {
        self.numeric_columns
            .first()
            .map(|name| (name.as_str(), self.column(name)))
    }
}

// serde_json writes non-finite floats as `null`; read them back as NaN.
fn nullable_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

fn nullable_f64_vec<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let values = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total_rows: usize,
    pub total_columns: usize,
    pub numeric_columns: usize,
    pub categorical_columns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRecord {
    pub column: String,
    #[serde(deserialize_with = "nullable_f64")]
    pub min: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub max: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub mean: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub median: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendFinding {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub confidence: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub metric: String,
    #[serde(deserialize_with = "nullable_f64")]
    pub current_value: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub predicted_value: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub change: f64,
    pub timeframe: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFinding {
    pub description: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    #[serde(deserialize_with = "nullable_f64_vec")]
    pub values: Vec<f64>,
    #[serde(deserialize_with = "nullable_f64_vec")]
    pub predictions: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: AnalysisSummary,
    pub statistics: Vec<StatisticsRecord>,
    pub trends: Vec<TrendFinding>,
    pub predictions: Vec<PredictionRecord>,
    pub anomalies: Vec<AnomalyFinding>,
    pub insights: Vec<String>,
    pub chart_data: ChartSeries,
}
