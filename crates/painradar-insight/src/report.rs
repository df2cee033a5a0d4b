use std::fmt::Write as _;

use crate::types::InsightReport;

const EXAMPLE_CHARS: usize = 60;
const MAX_EXAMPLES: usize = 2;

/// Renders a report as console text.
#[must_use]
pub fn format_report(report: &InsightReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "AI ANALYSIS: \"{}\"", report.topic);
    if let Some(model) = &report.model {
        let _ = writeln!(out, "Model: {model}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "  {}", report.summary);

    if !report.categories.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Problem categories:");
        for category in &report.categories {
            let _ = writeln!(out, "  - {} ({} posts)", category.name, category.count);
            for example in category.examples.iter().take(MAX_EXAMPLES) {
                let _ = writeln!(out, "      \"{}\"", clip(example));
            }
        }
    }

    write_list(&mut out, "Key insights:", &report.top_insights);
    write_list(&mut out, "Recommendations:", &report.recommendations);
    out
}

fn write_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{heading}");
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "  {}. {item}", i + 1);
    }
}

fn clip(text: &str) -> String {
    if text.chars().count() <= EXAMPLE_CHARS {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(EXAMPLE_CHARS).collect();
    clipped.push_str("...");
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProblemCategory;

    #[test]
    fn renders_all_sections() {
        let report = InsightReport {
            topic: "banks".to_string(),
            model: Some("m/one".to_string()),
            structured: true,
            summary: "Fees are the main complaint.".to_string(),
            categories: vec![ProblemCategory {
                name: "Fees".to_string(),
                count: 3,
                examples: vec![
                    "hidden fee".to_string(),
                    "x".repeat(80),
                    "third example".to_string(),
                ],
            }],
            top_insights: vec!["People hate surprise fees".to_string()],
            recommendations: vec!["Publish a fee table".to_string()],
            raw: String::new(),
        };

        let text = format_report(&report);
        assert!(text.starts_with("AI ANALYSIS: \"banks\""));
        assert!(text.contains("Model: m/one"));
        assert!(text.contains("  - Fees (3 posts)"));
        assert!(text.contains("\"hidden fee\""));
        assert!(text.contains(&format!("\"{}...\"", "x".repeat(60))));
        assert!(!text.contains("third example"));
        assert!(text.contains("  1. People hate surprise fees"));
        assert!(text.contains("Recommendations:\n  1. Publish a fee table"));
    }

    #[test]
    fn degraded_report_shows_only_summary() {
        let report = InsightReport {
            topic: "t".to_string(),
            summary: "free text reply".to_string(),
            ..InsightReport::default()
        };
        let text = format_report(&report);
        assert!(text.contains("Summary:\n  free text reply"));
        assert!(!text.contains("Problem categories"));
        assert!(!text.contains("Key insights"));
    }
}
