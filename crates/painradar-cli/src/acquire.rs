//! Acquisition command handlers: trending, search, single-platform fetches
//! and profiles.
//!
//! A platform that fails is reported in the output, never as a process error.

use std::collections::BTreeMap;

use painradar_core::{AcquisitionResult, Platform, RadarConfig, Target};
use painradar_scraper::Orchestrator;
use painradar_signals::aggregate::{dedupe_results, sort_results_by_popularity};
use painradar_signals::export::{results_to_csv, to_json};

use crate::output::{emit, format_profile, format_results, profile_csv, OutputFormat};
use crate::{OutputArgs, ShapingArgs};

/// A fetch that targets exactly one platform.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Single<'a> {
    Category(&'a str),
    Channel(&'a str),
    UserPosts(&'a str),
}

fn orchestrator(config: &RadarConfig) -> anyhow::Result<Orchestrator> {
    Ok(Orchestrator::from_config(config)?)
}

/// Applies `--dedupe` then `--sort-popular`.
pub(crate) fn shape(
    results: BTreeMap<Platform, AcquisitionResult>,
    shaping: &ShapingArgs,
) -> BTreeMap<Platform, AcquisitionResult> {
    let results = if shaping.dedupe {
        dedupe_results(results)
    } else {
        results
    };
    if shaping.sort_popular {
        sort_results_by_popularity(results)
    } else {
        results
    }
}

pub(crate) fn render_results(
    results: &BTreeMap<Platform, AcquisitionResult>,
    format: OutputFormat,
) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Text => format_results(results),
        OutputFormat::Json => to_json(results)?,
        OutputFormat::Csv => results_to_csv(results),
    })
}

fn finish(
    results: BTreeMap<Platform, AcquisitionResult>,
    shaping: &ShapingArgs,
) -> anyhow::Result<()> {
    let results = shape(results, shaping);
    let failed = results.values().filter(|r| !r.success).count();
    if failed > 0 {
        tracing::warn!(failed, total = results.len(), "some platforms failed");
    }
    let body = render_results(&results, shaping.output.format)?;
    emit(&body, shaping.output.output.as_deref())
}

/// # Errors
///
/// Returns an error if shared resources cannot be built or output cannot be written.
pub(crate) async fn run_trending(
    config: &RadarConfig,
    targets: &[Target],
    shaping: &ShapingArgs,
) -> anyhow::Result<()> {
    let orchestrator = orchestrator(config)?;
    tracing::info!(platforms = ?orchestrator.resolve(targets), "fetching trending");
    let results = orchestrator.fetch_trending(targets).await;
    finish(results, shaping)
}

/// # Errors
///
/// Returns an error if shared resources cannot be built or output cannot be written.
pub(crate) async fn run_search(
    config: &RadarConfig,
    query: &str,
    targets: &[Target],
    shaping: &ShapingArgs,
) -> anyhow::Result<()> {
    let orchestrator = orchestrator(config)?;
    tracing::info!(query, platforms = ?orchestrator.resolve(targets), "searching");
    let results = orchestrator.fetch_by_search(query, targets).await;
    finish(results, shaping)
}

/// # Errors
///
/// Returns an error if shared resources cannot be built or output cannot be written.
pub(crate) async fn run_single(
    config: &RadarConfig,
    request: Single<'_>,
    platform: Platform,
    shaping: &ShapingArgs,
) -> anyhow::Result<()> {
    let orchestrator = orchestrator(config)?;
    let result = match request {
        Single::Category(name) => orchestrator.fetch_by_category(name, platform).await,
        Single::Channel(name) => orchestrator.fetch_by_channel(name, platform).await,
        Single::UserPosts(handle) => orchestrator.fetch_user_posts(handle, platform).await,
    };
    finish(BTreeMap::from([(platform, result)]), shaping)
}

/// # Errors
///
/// Returns an error if the profile is unavailable, shared resources cannot be
/// built, or output cannot be written.
pub(crate) async fn run_profile(
    config: &RadarConfig,
    handle: &str,
    platform: Platform,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let orchestrator = orchestrator(config)?;
    let profile = orchestrator
        .fetch_profile(handle, platform)
        .await
        .ok_or_else(|| anyhow::anyhow!("profile '{handle}' not found on {}", platform.label()))?;

    let body = match output.format {
        OutputFormat::Text => format_profile(&profile),
        OutputFormat::Json => to_json(&profile)?,
        OutputFormat::Csv => profile_csv(&profile),
    };
    emit(&body, output.output.as_deref())
}
