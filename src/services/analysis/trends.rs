use rand::Rng;

use super::types::{ParsedTable, TrendFinding};
use super::utils::{display_number, mean, round_half_up};

const GROWTH_RATIO: f64 = 1.1;
const DECLINE_RATIO: f64 = 0.9;

/// Trend findings for a parsed table.
///
/// The direction entry compares the first and second halves of the first
/// numeric column. "Correlation Detected" only names the first two numeric
/// columns; no correlation coefficient is computed.
pub fn detect_trends<R: Rng + ?Sized>(
    table: &ParsedTable,
    total_columns: usize,
    rng: &mut R,
) -> Vec<TrendFinding> {
    let mut trends = Vec::new();

    if let Some((name, values)) = table.first_numeric() {
        trends.push(direction(name, values, rng));
    }

    let numeric = table.numeric_columns.len();
    trends.push(TrendFinding {
        kind: "Data Distribution".to_string(),
        description: format!(
            "Dataset contains {} records with {} numeric and {} categorical columns",
            table.data_rows,
            numeric,
            total_columns.saturating_sub(numeric)
        ),
        confidence: 100,
    });

    if let [first, second, ..] = table.numeric_columns.as_slice() {
        trends.push(TrendFinding {
            kind: "Correlation Detected".to_string(),
            description: format!(
                "Potential correlation identified between {} and {}",
                first, second
            ),
            confidence: 70 + rng.gen_range(0..20),
        });
    }

    trends
}

fn direction<R: Rng + ?Sized>(name: &str, values: &[f64], rng: &mut R) -> TrendFinding {
    let (first_half, second_half) = values.split_at(values.len() / 2);
    let first_avg = mean(first_half);
    let second_avg = mean(second_half);

    if second_avg > first_avg * GROWTH_RATIO {
        TrendFinding {
            kind: "Upward Trend".to_string(),
            description: format!(
                "{} shows consistent growth of {}% over the dataset period",
                name,
                display_number(round_half_up((second_avg / first_avg - 1.0) * 100.0))
            ),
            confidence: 85 + rng.gen_range(0..10),
        }
    } else if second_avg < first_avg * DECLINE_RATIO {
        TrendFinding {
            kind: "Downward Trend".to_string(),
            description: format!(
                "{} shows a decline of {}% over the dataset period",
                name,
                display_number(round_half_up((1.0 - second_avg / first_avg) * 100.0))
            ),
            confidence: 82 + rng.gen_range(0..10),
        }
    } else {
        TrendFinding {
            kind: "Stable Pattern".to_string(),
            description: format!(
                "{} maintains relatively stable values with minor fluctuations",
                name
            ),
            confidence: 78 + rng.gen_range(0..15),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::parser::parse;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table(content: &str, columns: &[&str]) -> ParsedTable {
        let columns: Vec<String> = columns.iter().map(|s| s.to_string()).collect();
        parse(content, &columns)
    }

    #[test]
    fn test_upward_trend_confidence_range() {
        let t = table("sales\n10\n10\n20\n20\n", &["sales"]);

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let trends = detect_trends(&t, 1, &mut rng);
            assert_eq!(trends[0].kind, "Upward Trend");
            assert_eq!(
                trends[0].description,
                "sales shows consistent growth of 100% over the dataset period"
            );
            assert!((85..=94).contains(&trends[0].confidence));
        }
    }

    #[test]
    fn test_downward_trend() {
        let t = table("v\n100\n100\n50\n50\n", &["v"]);
        let mut rng = StdRng::seed_from_u64(7);

        let trends = detect_trends(&t, 1, &mut rng);
        assert_eq!(trends[0].kind, "Downward Trend");
        assert_eq!(
            trends[0].description,
            "v shows a decline of 50% over the dataset period"
        );
        assert!((82..=91).contains(&trends[0].confidence));
    }

    #[test]
    fn test_growth_from_zero_reads_infinity() {
        let t = table("v\n0\n5\n", &["v"]);
        let mut rng = StdRng::seed_from_u64(5);

        let trends = detect_trends(&t, 1, &mut rng);
        assert_eq!(trends[0].kind, "Upward Trend");
        assert_eq!(
            trends[0].description,
            "v shows consistent growth of Infinity% over the dataset period"
        );
    }

    #[test]
    fn test_stable_pattern_and_odd_split() {
        // First half is [10], second half is [10, 10.5]
        let t = table("v\n10\n10\n10.5\n", &["v"]);
        let mut rng = StdRng::seed_from_u64(3);

        let trends = detect_trends(&t, 1, &mut rng);
        assert_eq!(trends[0].kind, "Stable Pattern");
        assert!((78..=92).contains(&trends[0].confidence));
    }

    #[test]
    fn test_single_value_is_stable() {
        let t = table("v\n5\n", &["v"]);
        let mut rng = StdRng::seed_from_u64(1);

        let trends = detect_trends(&t, 1, &mut rng);
        assert_eq!(trends[0].kind, "Stable Pattern");
    }

    #[test]
    fn test_distribution_and_correlation() {
        let t = table("a,b,c\n1,2,x\n2,3,y\n", &["a", "b", "c"]);
        let mut rng = StdRng::seed_from_u64(11);

        let trends = detect_trends(&t, 3, &mut rng);
        assert_eq!(trends.len(), 3);
        assert_eq!(trends[1].kind, "Data Distribution");
        assert_eq!(trends[1].confidence, 100);
        assert_eq!(
            trends[1].description,
            "Dataset contains 2 records with 2 numeric and 1 categorical columns"
        );
        assert_eq!(trends[2].kind, "Correlation Detected");
        assert_eq!(
            trends[2].description,
            "Potential correlation identified between a and b"
        );
        assert!((70..=89).contains(&trends[2].confidence));
    }

    #[test]
    fn test_categorical_only_table() {
        let t = table("name\nx\ny\n", &["name"]);
        let mut rng = StdRng::seed_from_u64(0);

        let trends = detect_trends(&t, 1, &mut rng);
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].kind, "Data Distribution");
    }
}
