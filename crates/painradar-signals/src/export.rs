//! JSON and CSV export.
//!
//! JSON keeps every field. CSV is the flat spreadsheet view: one row per
//! scored post with the columns in [`SCORED_HEADER`], quoted per RFC 4180.
//! Empty metric cells mean the source did not expose that metric.

use std::collections::BTreeMap;

use painradar_core::{AcquisitionResult, Platform};
use painradar_scraper::extract::truncate_chars;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::types::ScoredPost;

pub const SCORED_HEADER: [&str; 10] = [
    "platform",
    "score",
    "engagement",
    "problem",
    "title",
    "author",
    "url",
    "likes",
    "comments",
    "views",
];

pub const RESULTS_HEADER: [&str; 10] = [
    "platform",
    "type",
    "id",
    "title",
    "author",
    "url",
    "likes",
    "comments",
    "views",
    "collected_at",
];

const TITLE_CHARS: usize = 100;

/// One flattened row of the scored-post CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRow {
    pub platform: Platform,
    pub score: u8,
    pub engagement: u8,
    pub problem: u8,
    /// Title, or content when there is no title, cut to 100 characters.
    pub title: String,
    pub author: String,
    pub url: String,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub views: Option<u64>,
}

impl From<&ScoredPost> for CsvRow {
    fn from(scored: &ScoredPost) -> Self {
        let post = &scored.post;
        Self {
            platform: post.platform,
            score: scored.total_score,
            engagement: scored.engagement_score,
            problem: scored.problem_score,
            title: truncate_chars(post.title.as_deref().unwrap_or(&post.content), TITLE_CHARS),
            author: post.author_handle.clone(),
            url: post.url.clone(),
            likes: post.likes,
            comments: post.comments,
            views: post.views,
        }
    }
}

/// Pretty-printed JSON of any exportable value.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[must_use]
pub fn to_csv(posts: &[ScoredPost]) -> String {
    let mut out = csv_line(SCORED_HEADER.iter().map(|h| (*h).to_string()));
    for scored in posts {
        let row = CsvRow::from(scored);
        out.push_str(&csv_line([
            row.platform.to_string(),
            row.score.to_string(),
            row.engagement.to_string(),
            row.problem.to_string(),
            row.title,
            row.author,
            row.url,
            metric_cell(row.likes),
            metric_cell(row.comments),
            metric_cell(row.views),
        ]));
    }
    out
}

/// Reads rows written by [`to_csv`].
///
/// # Errors
///
/// Returns [`ExportError::Csv`] for a wrong header, a wrong column count,
/// unbalanced quotes, or a cell that does not parse.
pub fn parse_csv(input: &str) -> Result<Vec<CsvRow>, ExportError> {
    let records = split_records(input)?;
    let mut records = records.into_iter();
    match records.next() {
        Some((_, header)) if header == SCORED_HEADER => {}
        Some((line, header)) => {
            return Err(ExportError::Csv {
                line,
                reason: format!("unexpected header: {}", header.join(",")),
            });
        }
        None => return Ok(Vec::new()),
    }

    records
        .map(|(line, fields)| parse_row(line, fields))
        .collect()
}

fn parse_row(line: usize, fields: Vec<String>) -> Result<CsvRow, ExportError> {
    let Ok(cells) = <[String; 10]>::try_from(fields) else {
        return Err(ExportError::Csv {
            line,
            reason: format!("expected {} columns", SCORED_HEADER.len()),
        });
    };
    let [platform, score, engagement, problem, title, author, url, likes, comments, views] = cells;
    let invalid = |column: &str, value: &str| ExportError::Csv {
        line,
        reason: format!("invalid {column} '{value}'"),
    };
    let score_cell = |column: &str, value: &str| -> Result<u8, ExportError> {
        value.parse::<u8>().map_err(|_| invalid(column, value))
    };
    let metric = |column: &str, value: &str| -> Result<Option<u64>, ExportError> {
        if value.is_empty() {
            Ok(None)
        } else {
            value.parse::<u64>().map(Some).map_err(|_| invalid(column, value))
        }
    };

    Ok(CsvRow {
        platform: platform
            .parse()
            .map_err(|_| invalid("platform", &platform))?,
        score: score_cell("score", &score)?,
        engagement: score_cell("engagement", &engagement)?,
        problem: score_cell("problem", &problem)?,
        title,
        author,
        url,
        likes: metric("likes", &likes)?,
        comments: metric("comments", &comments)?,
        views: metric("views", &views)?,
    })
}

/// Raw acquisition results as CSV: one row per post and per profile.
#[must_use]
pub fn results_to_csv(results: &BTreeMap<Platform, AcquisitionResult>) -> String {
    let mut out = csv_line(RESULTS_HEADER.iter().map(|h| (*h).to_string()));
    for (platform, result) in results {
        for post in &result.posts {
            out.push_str(&csv_line([
                platform.to_string(),
                "post".to_string(),
                post.platform_id.clone(),
                truncate_chars(post.title.as_deref().unwrap_or(&post.content), TITLE_CHARS),
                post.author_handle.clone(),
                post.url.clone(),
                metric_cell(post.likes),
                metric_cell(post.comments),
                metric_cell(post.views),
                post.collected_at.to_rfc3339(),
            ]));
        }
        for profile in &result.profiles {
            out.push_str(&csv_line([
                platform.to_string(),
                "profile".to_string(),
                profile.handle.clone(),
                profile.display_name.clone(),
                profile.handle.clone(),
                profile.profile_url.clone(),
                metric_cell(profile.follower_count),
                String::new(),
                String::new(),
                String::new(),
            ]));
        }
    }
    out
}

fn metric_cell(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_line<I>(fields: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut line = fields
        .into_iter()
        .map(|f| escape_field(&f))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

/// Splits CSV text into records of unescaped fields, each tagged with the
/// 1-based line it starts on. Blank lines between records are skipped.
fn split_records(input: &str) -> Result<Vec<(usize, Vec<String>)>, ExportError> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                if !fields.is_empty() || !field.is_empty() {
                    fields.push(std::mem::take(&mut field));
                    records.push((record_line, std::mem::take(&mut fields)));
                }
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(ExportError::Csv {
            line: record_line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !fields.is_empty() || !field.is_empty() {
        fields.push(field);
        records.push((record_line, fields));
    }
    Ok(records)
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
