//! Plain-text rendering of acquisition results and problem searches.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use painradar_core::{AcquisitionResult, Platform};
use painradar_scraper::extract::truncate_chars;

use crate::types::{FinderResult, ScoredPost};

const RULE_WIDTH: usize = 60;
const MAX_LISTED: usize = 20;

#[allow(clippy::cast_precision_loss)]
fn seconds(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

/// Per-platform status, counts, duration and error count, then totals.
#[must_use]
pub fn format_summary(results: &BTreeMap<Platform, AcquisitionResult>) -> String {
    let mut out = String::from("Acquisition results:\n\n");
    let mut total_posts = 0;
    let mut total_profiles = 0;
    for (platform, result) in results {
        let status = if result.success { "ok" } else { "FAILED" };
        let _ = writeln!(out, "[{status}] {}", platform.label());
        let _ = writeln!(out, "   posts:    {}", result.posts.len());
        let _ = writeln!(out, "   profiles: {}", result.profiles.len());
        let _ = writeln!(out, "   time:     {:.1}s", seconds(result.stats.duration_ms));
        if !result.errors.is_empty() {
            let _ = writeln!(out, "   errors:   {}", result.errors.len());
            for error in &result.errors {
                let _ = writeln!(out, "     - {error}");
            }
        }
        out.push('\n');
        total_posts += result.posts.len();
        total_profiles += result.profiles.len();
    }
    let _ = write!(out, "Total: {total_posts} posts, {total_profiles} profiles");
    out
}

fn headline(post: &ScoredPost, width: usize) -> String {
    let text = post.post.title.as_deref().unwrap_or(&post.post.content);
    let cut = truncate_chars(text, width);
    if cut.chars().count() < text.chars().count() {
        format!("{cut}...")
    } else {
        cut
    }
}

/// Stats block, the top problems in detail, then the first twenty ranked posts.
#[must_use]
pub fn format_findings(result: &FinderResult) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}\nPROBLEM FINDER: \"{}\"\n{rule}\n", result.query);

    let platforms: Vec<&str> = result.platforms.iter().map(|p| p.as_str()).collect();
    let _ = writeln!(out, "Platforms:         {}", platforms.join(", "));
    let _ = writeln!(out, "Queries:           {}", result.queries.join(" | "));
    let _ = writeln!(out, "Posts found:       {}", result.total_posts);
    let _ = writeln!(out, "After filtering:   {}", result.ranked.len());
    let _ = writeln!(out, "Mean engagement:   {}/100", result.stats.mean_engagement);
    let _ = writeln!(out, "Mean problem:      {}/100", result.stats.mean_problem_score);
    let _ = writeln!(out, "Time:              {:.1}s", seconds(result.stats.duration_ms));
    for (platform, errors) in &result.stats.errors {
        let _ = writeln!(out, "Errors ({platform}):  {}", errors.len());
    }

    if !result.top_problems.is_empty() {
        let _ = writeln!(out, "\nTOP PROBLEMS (high engagement and problem language)\n{thin}");
        for (i, post) in result.top_problems.iter().enumerate() {
            let b = &post.breakdown;
            let _ = writeln!(out, "\n{}. {}", i + 1, headline(post, 80));
            let _ = writeln!(
                out,
                "   score {} (engagement {}, problem {})",
                post.total_score, post.engagement_score, post.problem_score
            );
            let _ = writeln!(
                out,
                "   likes {} | comments {} | views {}",
                b.likes, b.comments, b.views
            );
            let _ = writeln!(out, "   {} | {}", post.post.platform, post.post.author_handle);
            let _ = writeln!(out, "   {}", post.post.url);
        }
    }

    if result.ranked.len() > result.top_problems.len() {
        let _ = writeln!(out, "\nALL RESULTS (first {MAX_LISTED})\n{thin}");
        for (i, post) in result.ranked.iter().take(MAX_LISTED).enumerate() {
            let b = &post.breakdown;
            let _ = writeln!(
                out,
                "{}. [{}] {} ({})",
                i + 1,
                post.total_score,
                headline(post, 60),
                post.post.platform
            );
            let _ = writeln!(
                out,
                "   likes {} comments {} views {}",
                b.likes, b.comments, b.views
            );
        }
    }
    out
}
