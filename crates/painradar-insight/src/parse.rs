//! Structured extraction of a model reply, with a raw-text fallback.

use serde::Deserialize;

use crate::types::{InsightReport, ProblemCategory};

const DEGRADED_SUMMARY_CHARS: usize = 500;
const DEFAULT_SUMMARY: &str = "Analysis complete.";

/// The JSON shape the prompt asks for.
#[derive(Debug, Deserialize)]
struct Analysis {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    categories: Vec<ProblemCategory>,
    #[serde(default, rename = "topInsights", alias = "top_insights")]
    top_insights: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

/// Removes Markdown code fences such as ```` ```json ```` around a reply.
#[must_use]
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string ("json") up to the end of the fence line.
        text = rest.split_once('\n').map_or("", |(_, body)| body);
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parses a model reply into a report. Never fails: a reply that is not the
/// expected JSON gives a report with `structured == false` whose summary is
/// the first 500 characters of the reply.
#[must_use]
pub fn parse_structured(topic: &str, raw: &str) -> InsightReport {
    match serde_json::from_str::<Analysis>(strip_fences(raw)) {
        Ok(analysis) => InsightReport {
            topic: topic.to_string(),
            model: None,
            structured: true,
            summary: analysis
                .summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
            categories: analysis.categories,
            top_insights: analysis.top_insights,
            recommendations: analysis.recommendations,
            raw: raw.to_string(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "model reply is not valid analysis JSON, keeping raw text");
            InsightReport {
                topic: topic.to_string(),
                structured: false,
                summary: raw.chars().take(DEGRADED_SUMMARY_CHARS).collect(),
                raw: raw.to_string(),
                ..InsightReport::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"{
        "summary": "Users struggle with failed payments.",
        "categories": [{"name": "Payments", "count": 4, "examples": ["card declined"]}],
        "topInsights": ["Declines spike on weekends"],
        "recommendations": ["Add a retry button"]
    }"#;

    #[test]
    fn parses_plain_json() {
        let report = parse_structured("payments", REPLY);
        assert!(report.structured);
        assert_eq!(report.summary, "Users struggle with failed payments.");
        assert_eq!(report.categories[0].name, "Payments");
        assert_eq!(report.categories[0].count, 4);
        assert_eq!(report.top_insights, vec!["Declines spike on weekends"]);
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.raw, REPLY);
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{REPLY}\n```");
        let report = parse_structured("payments", &fenced);
        assert!(report.structured);
        assert_eq!(report.categories.len(), 1);

        let bare_fence = format!("```\n{REPLY}\n```\n");
        assert!(parse_structured("payments", &bare_fence).structured);
    }

    #[test]
    fn garbage_degrades_to_raw_text() {
        let raw = "Sorry, I cannot produce JSON today. ".repeat(30);
        let report = parse_structured("payments", &raw);
        assert!(!report.structured);
        assert_eq!(report.summary.chars().count(), 500);
        assert!(report.categories.is_empty());
        assert_eq!(report.raw, raw);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let report = parse_structured("t", r#"{"categories": []}"#);
        assert!(report.structured);
        assert_eq!(report.summary, "Analysis complete.");
        assert!(report.top_insights.is_empty());
    }

    #[test]
    fn strip_fences_leaves_unfenced_text() {
        assert_eq!(strip_fences("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }
}
