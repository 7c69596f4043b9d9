use serde_json::Value;
use std::collections::HashMap;

use super::types::ParsedTable;
use super::utils::parse_cell;

/// Share of data rows that must hold a parseable number before a column
/// counts as numeric. The comparison is strict.
pub const NUMERIC_THRESHOLD: f64 = 0.5;

/// Builds the numeric view of an uploaded table.
///
/// Content holding a JSON array is read row-per-element; anything else is
/// treated as comma-separated text whose first non-blank line is the header.
/// Unparseable cells are skipped silently.
pub fn parse(raw_content: &str, declared_columns: &[String]) -> ParsedTable {
    match json_rows(raw_content) {
        Some(rows) => classify(rows.len(), declared_columns, |_, name| {
            rows.iter()
                .filter_map(|row| row.get(name).and_then(json_cell))
                .filter(|v| !v.is_nan())
                .collect()
        }),
        None => {
            let rows = csv_data_rows(raw_content);
            classify(rows.len(), declared_columns, |idx, _| {
                rows.iter()
                    .filter_map(|row| row.split(',').nth(idx).and_then(parse_cell))
                    .filter(|v| !v.is_nan())
                    .collect()
            })
        }
    }
}

/// Data lines of CSV text: blank lines dropped, header skipped.
pub fn csv_data_rows(raw_content: &str) -> Vec<&str> {
    raw_content
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .skip(1)
        .collect()
}

fn classify<F>(data_rows: usize, declared_columns: &[String], mut column_values: F) -> ParsedTable
where
    F: FnMut(usize, &str) -> Vec<f64>,
{
    let mut values = HashMap::new();
    let mut numeric_columns = Vec::new();

    for (idx, name) in declared_columns.iter().enumerate() {
        let parsed = column_values(idx, name);
        if parsed.len() as f64 > data_rows as f64 * NUMERIC_THRESHOLD {
            numeric_columns.push(name.clone());
            values.insert(name.clone(), parsed);
        } else {
            tracing::debug!(
                "Column {} treated as categorical ({} of {} cells numeric)",
                name,
                parsed.len(),
                data_rows
            );
        }
    }

    ParsedTable {
        data_rows,
        values,
        numeric_columns,
    }
}

fn json_rows(raw_content: &str) -> Option<Vec<serde_json::Map<String, Value>>> {
    match serde_json::from_str::<Value>(raw_content.trim()) {
        Ok(Value::Array(items)) => Some(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                })
                .collect(),
        ),
        _ => None,
    }
}

fn json_cell(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_cell(s),
        _ => None,
    }
}
