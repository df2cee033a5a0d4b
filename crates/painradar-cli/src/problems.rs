//! The `problems` command: ranked problem search with optional model summary.

use painradar_core::{RadarConfig, Target};
use painradar_insight::{format_report, InsightReport, Summarizer};
use painradar_signals::export::{to_csv, to_json};
use painradar_signals::report::format_findings;
use painradar_signals::{FindOptions, FinderResult, ProblemFinder};
use serde::Serialize;

use crate::output::{emit, OutputFormat};
use crate::OutputArgs;

/// JSON document for a search, with the summary when one was produced.
#[derive(Debug, Serialize)]
pub(crate) struct ProblemsDocument<'a> {
    #[serde(flatten)]
    pub result: &'a FinderResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<&'a InsightReport>,
}

/// Asks the configured models for a summary. Every failure is logged and
/// yields `None`; the search output is still produced.
async fn analyze(config: &RadarConfig, result: &FinderResult) -> Option<InsightReport> {
    let summarizer = Summarizer::from_config(config)?;
    match summarizer.summarize(&result.query, &result.ranked).await {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::warn!(error = %e, "insight analysis failed");
            None
        }
    }
}

pub(crate) fn render(
    result: &FinderResult,
    insight: Option<&InsightReport>,
    format: OutputFormat,
) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Text => {
            let mut text = format_findings(result);
            if let Some(report) = insight {
                text.push('\n');
                text.push_str(&format_report(report));
            }
            text
        }
        OutputFormat::Json => to_json(&ProblemsDocument { result, insight })?,
        OutputFormat::Csv => to_csv(&result.ranked),
    })
}

/// # Errors
///
/// Returns an error for invalid options, when shared resources cannot be
/// built, or when output cannot be written.
pub(crate) async fn run_problems(
    config: &RadarConfig,
    topic: &str,
    targets: &[Target],
    options: FindOptions,
    analyze_results: bool,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let finder = ProblemFinder::from_config(config)?;
    let result = finder.find_problems(topic, targets, options).await?;
    tracing::info!(
        topic,
        found = result.total_posts,
        ranked = result.ranked.len(),
        top = result.top_problems.len(),
        "problem search complete"
    );

    let insight = if analyze_results {
        analyze(config, &result).await
    } else {
        None
    };
    let body = render(&result, insight.as_ref(), output.format)?;
    emit(&body, output.output.as_deref())
}
