//! Rendering and writing of command output.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use painradar_core::{AcquisitionResult, Platform, Profile};
use painradar_scraper::extract::truncate_chars;

const LISTED_PER_PLATFORM: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Writes `body` to `path`, or to stdout when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub(crate) fn emit(body: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = body.len(), "output written");
        }
        None => println!("{body}"),
    }
    Ok(())
}

/// Summary block followed by the first posts of every platform.
pub(crate) fn format_results(results: &BTreeMap<Platform, AcquisitionResult>) -> String {
    let mut out = painradar_signals::report::format_summary(results);
    for (platform, result) in results {
        if result.posts.is_empty() {
            continue;
        }
        let _ = write!(out, "\n\n{}:", platform.label());
        for (i, post) in result.posts.iter().take(LISTED_PER_PLATFORM).enumerate() {
            let text = post.title.as_deref().unwrap_or(&post.content);
            let _ = write!(
                out,
                "\n{:>3}. {}\n     likes {} | comments {} | views {}\n     {}",
                i + 1,
                truncate_chars(&text.replace('\n', " "), 80),
                post.likes.unwrap_or(0),
                post.comments.unwrap_or(0),
                post.views.unwrap_or(0),
                post.url
            );
        }
        if result.posts.len() > LISTED_PER_PLATFORM {
            let _ = write!(
                out,
                "\n     ... and {} more",
                result.posts.len() - LISTED_PER_PLATFORM
            );
        }
    }
    out
}

fn count(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub(crate) fn format_profile(profile: &Profile) -> String {
    let mut out = String::new();
    let verified = if profile.verified == Some(true) { " (verified)" } else { "" };
    let _ = writeln!(out, "{} @{}{verified}", profile.display_name, profile.handle);
    let _ = writeln!(out, "platform:  {}", profile.platform.label());
    let _ = writeln!(out, "followers: {}", count(profile.follower_count));
    let _ = writeln!(out, "following: {}", count(profile.following_count));
    let _ = writeln!(out, "posts:     {}", count(profile.post_count));
    if let Some(bio) = &profile.bio {
        let _ = writeln!(out, "bio:       {}", truncate_chars(bio, 200));
    }
    let _ = write!(out, "url:       {}", profile.profile_url);
    out
}

/// CSV of a single profile, using the raw acquisition column layout.
pub(crate) fn profile_csv(profile: &Profile) -> String {
    let mut result = AcquisitionResult::new(profile.platform);
    result.profiles.push(profile.clone());
    result.refresh();
    painradar_signals::export::results_to_csv(&BTreeMap::from([(profile.platform, result)]))
}
