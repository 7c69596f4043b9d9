use rand::Rng;

use super::types::{ParsedTable, PredictionRecord, PREDICTION_COLUMN_LIMIT};
use super::utils::{mean, round2, round_half_up};

pub const TIMEFRAME: &str = "Next Period";

/// Projects the first three numeric columns one period ahead by a random
/// growth factor in `[0.9, 1.2)`. Not fitted to the data.
pub fn predict<R: Rng + ?Sized>(table: &ParsedTable, rng: &mut R) -> Vec<PredictionRecord> {
    table
        .numeric_columns
        .iter()
        .take(PREDICTION_COLUMN_LIMIT)
        .map(|name| project(name, table.column(name), rng))
        .collect()
}

fn project<R: Rng + ?Sized>(name: &str, values: &[f64], rng: &mut R) -> PredictionRecord {
    // A missing or zero last value falls back to the column mean
    let current_value = match values.last() {
        Some(&last) if last != 0.0 => last,
        _ => mean(values),
    };
    let growth_rate = 1.0 + (rng.gen::<f64>() * 0.3 - 0.1);

    PredictionRecord {
        metric: name.to_string(),
        current_value: round2(current_value),
        predicted_value: round2(current_value * growth_rate),
        change: round_half_up((growth_rate - 1.0) * 1000.0) / 10.0,
        timeframe: TIMEFRAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::parser::parse;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_predictions_stay_in_growth_band() {
        let columns: Vec<String> = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        let table = parse("a,b,c,d\n1,2,3,4\n10,200,30,40\n", &columns);

        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let predictions = predict(&table, &mut rng);

            assert_eq!(predictions.len(), 3);
            for p in &predictions {
                assert_eq!(p.timeframe, "Next Period");
                assert!(p.predicted_value >= p.current_value * 0.9 - 0.005);
                assert!(p.predicted_value <= p.current_value * 1.2 + 0.005);
                assert!(p.change >= -10.0 && p.change <= 20.0);
            }
            assert_eq!(predictions[1].current_value, 200.0);
        }
    }

    #[test]
    fn test_zero_last_value_uses_mean() {
        let columns = vec!["v".to_string()];
        let table = parse("v\n4\n8\n0\n", &columns);
        let mut rng = StdRng::seed_from_u64(5);

        let predictions = predict(&table, &mut rng);
        assert_eq!(predictions[0].current_value, 4.0);
    }

    #[test]
    fn test_no_numeric_columns() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(predict(&ParsedTable::default(), &mut rng).is_empty());
    }
}
