//! Rule-based chat replies.
//!
//! Rules are checked top to bottom against the lower-cased message and the
//! first match answers, so a message mentioning both "file" and "trend" gets
//! the dataset reply.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::services::analysis::AnalysisResult;

static GREETING_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^hey").expect("greeting pattern is valid"));

const MAX_LISTED_DATASETS: usize = 3;
const MAX_LISTED_TRENDS: usize = 3;
const MAX_LISTED_INSIGHTS: usize = 4;
const ECHO_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct DatasetBrief {
    pub filename: String,
    pub row_count: usize,
    pub column_count: usize,
}

/// What the assistant knows about the caller: their datasets, newest first,
/// and the results of their completed analyses.
#[derive(Debug, Clone, Default)]
pub struct AssistantContext {
    pub datasets: Vec<DatasetBrief>,
    pub results: Vec<AnalysisResult>,
}

struct Rule {
    name: &'static str,
    matches: fn(&str) -> bool,
    respond: fn(&str, &AssistantContext) -> String,
}

fn contains_any(message: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| message.contains(k))
}

const RULES: &[Rule] = &[
    Rule {
        name: "datasets",
        matches: |m| contains_any(m, &["dataset", "file", "upload"]),
        respond: datasets_reply,
    },
    Rule {
        name: "trends",
        matches: |m| contains_any(m, &["trend", "pattern", "growth"]),
        respond: trends_reply,
    },
    Rule {
        name: "insights",
        matches: |m| contains_any(m, &["insight", "finding", "discover"]),
        respond: insights_reply,
    },
    Rule {
        name: "predictions",
        matches: |m| contains_any(m, &["predict", "forecast", "future"]),
        respond: |_, _| {
            "Our AI analysis includes predictive modeling based on your historical data. \
             Check the Analysis page to see forecasts and predictions for your key metrics. \
             The predictions use time-series analysis and pattern recognition to estimate future values."
                .to_string()
        },
    },
    Rule {
        name: "anomalies",
        matches: |m| contains_any(m, &["anomal", "outlier", "unusual"]),
        respond: |_, _| {
            "Anomaly detection is part of our analysis pipeline. We identify data points that \
             deviate significantly from expected patterns using statistical methods. Check your \
             analysis results for any flagged anomalies - they're marked by severity level \
             (low, medium, high)."
                .to_string()
        },
    },
    Rule {
        name: "help",
        matches: |m| contains_any(m, &["help", "start", "how"]),
        respond: |_, _| {
            "Here's how to get the most out of CortexCloud:\n\n\
             1. **Upload Data** - Go to the Upload page and drag-drop your CSV or JSON files\n\
             2. **Run Analysis** - Click \"Run AI Analysis\" to process your data through our ML pipeline\n\
             3. **Explore Insights** - View trends, predictions, and anomalies in the Insights page\n\
             4. **Ask Questions** - Chat with me anytime about your data!\n\n\
             What would you like to do first?"
                .to_string()
        },
    },
    Rule {
        name: "analysis",
        matches: |m| contains_any(m, &["analy", "process", "run"]),
        respond: |_, _| {
            "Our analysis pipeline processes your data through several stages:\n\n\
             1. **Preprocessing** - Data cleaning and normalization\n\
             2. **Pattern Detection** - Statistical analysis and trend identification\n\
             3. **Prediction Models** - Time-series forecasting\n\
             4. **Insight Generation** - Human-readable summaries\n\n\
             Each analysis typically takes a few seconds. Would you like to run an analysis on one of your datasets?"
                .to_string()
        },
    },
    Rule {
        name: "greeting",
        matches: |m| contains_any(m, &["hello", "hi"]) || GREETING_PREFIX.is_match(m),
        respond: |_, _| {
            "Hello! I'm the CortexCloud AI Assistant. I can help you:\n\n\
             • Understand your uploaded datasets\n\
             • Explain analysis results and trends\n\
             • Provide insights about your data\n\
             • Guide you through the platform\n\n\
             What would you like to know?"
                .to_string()
        },
    },
];

/// Reply to a chat message using the first matching rule, or the fallback.
pub fn respond(message: &str, context: &AssistantContext) -> String {
    let lower = message.to_lowercase();
    match RULES.iter().find(|rule| (rule.matches)(&lower)) {
        Some(rule) => {
            tracing::debug!("Assistant rule {} matched", rule.name);
            (rule.respond)(message, context)
        }
        None => fallback_reply(message),
    }
}

fn datasets_reply(_: &str, context: &AssistantContext) -> String {
    if context.datasets.is_empty() {
        return "You haven't uploaded any datasets yet. Head over to the Upload page to add \
                your first CSV or JSON file for analysis."
            .to_string();
    }

    let list = context
        .datasets
        .iter()
        .take(MAX_LISTED_DATASETS)
        .map(|d| format!("• {} ({} rows, {} columns)", d.filename, d.row_count, d.column_count))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You have {} dataset(s) uploaded:\n\n{}\n\nWould you like me to analyze any specific dataset or explain its contents?",
        context.datasets.len(),
        list
    )
}

fn trends_reply(_: &str, context: &AssistantContext) -> String {
    let trends: Vec<String> = context
        .results
        .iter()
        .flat_map(|r| r.trends.iter())
        .take(MAX_LISTED_TRENDS)
        .map(|t| format!("• {}", t.description))
        .collect();

    if trends.is_empty() {
        return "I don't see any analyzed data with trend information yet. Run an analysis on \
                your uploaded datasets to discover patterns and trends."
            .to_string();
    }

    format!(
        "Based on your analyzed data, here are the key trends I've identified:\n\n{}\n\nWould you like me to dive deeper into any of these patterns?",
        trends.join("\n")
    )
}

fn insights_reply(_: &str, context: &AssistantContext) -> String {
    let insights: Vec<String> = context
        .results
        .iter()
        .flat_map(|r| r.insights.iter())
        .take(MAX_LISTED_INSIGHTS)
        .map(|i| format!("• {}", i))
        .collect();

    if insights.is_empty() {
        return "No insights have been generated yet. Upload a dataset and run an analysis to \
                get AI-powered insights about your data."
            .to_string();
    }

    format!(
        "Here are the key insights from your data:\n\n{}\n\nIs there a specific aspect you'd like to explore further?",
        insights.join("\n")
    )
}

fn fallback_reply(message: &str) -> String {
    let echoed: String = message.chars().take(ECHO_CHARS).collect();
    let ellipsis = if message.chars().count() > ECHO_CHARS { "..." } else { "" };

    format!(
        "I understand you're asking about \"{}{}\". \n\n\
         As your CortexCloud AI Assistant, I can help with:\n\
         • Questions about your uploaded datasets\n\
         • Explaining analysis results and trends\n\
         • Interpreting predictions and anomalies\n\
         • General platform guidance\n\n\
         Could you be more specific about what you'd like to know? For example, try asking \
         \"What trends do you see in my data?\" or \"How do I run an analysis?\"",
        echoed, ellipsis
    )
}
