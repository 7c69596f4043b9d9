use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)")
        .expect("leading number pattern is valid")
});

/// Rounds half-way cases towards positive infinity, so `-2.5` becomes `-2`.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

pub fn round2(value: f64) -> f64 {
    round_half_up(value * 100.0) / 100.0
}

pub fn round1(value: f64) -> f64 {
    round_half_up(value * 10.0) / 10.0
}

/// Arithmetic mean. An empty slice gives `NaN`, which every comparison rejects.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N).
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Parses the longest numeric prefix of a cell, e.g. `"12.5kg"` yields `12.5`.
/// Cells without a numeric prefix yield `None`.
pub fn parse_leading_float(cell: &str) -> Option<f64> {
    let cell = cell.trim_start();
    let matched = LEADING_NUMBER.find(cell)?.as_str();

    let (sign, digits) = match matched.as_bytes()[0] {
        b'-' => (-1.0, &matched[1..]),
        b'+' => (1.0, &matched[1..]),
        _ => (1.0, matched),
    };

    if digits == "Infinity" {
        return Some(sign * f64::INFINITY);
    }

    digits.parse::<f64>().ok().map(|v| sign * v)
}

/// Formats a number for display text. Non-finite values read `Infinity`,
/// `-Infinity` and `NaN`, and negative zero reads `0`.
pub fn display_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// Strips double quotes and surrounding whitespace before parsing.
pub fn parse_cell(raw: &str) -> Option<f64> {
    let cleaned = raw.replace('"', "");
    parse_leading_float(cleaned.trim())
}
