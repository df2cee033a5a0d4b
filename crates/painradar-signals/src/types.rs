use std::collections::BTreeMap;
use std::fmt;

use painradar_core::{Platform, Post};
use serde::{Deserialize, Serialize};

use crate::error::FinderError;

/// Raw inputs behind a post's scores, kept for structured export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub likes: u64,
    pub comments: u64,
    pub views: u64,
    /// Distinct lexicon stems found in the post text.
    pub problem_words: usize,
}

/// A post with its engagement, problem and total scores, each in `0..=100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPost {
    #[serde(flatten)]
    pub post: Post,
    pub engagement_score: u8,
    pub problem_score: u8,
    pub total_score: u8,
    pub breakdown: ScoreBreakdown,
}

/// Caller-supplied knobs for one problem search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    /// Total queries including the unmodified topic.
    pub max_variations: usize,
    pub min_engagement: u8,
    pub min_problem_score: u8,
    pub max_results: usize,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            max_variations: 3,
            min_engagement: 0,
            min_problem_score: 0,
            max_results: 50,
        }
    }
}

impl FindOptions {
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidOptions`] for zero counts or thresholds above 100.
    pub fn validate(&self) -> Result<(), FinderError> {
        if self.max_variations == 0 {
            return Err(FinderError::InvalidOptions(
                "max_variations must be at least 1".to_string(),
            ));
        }
        if self.max_results == 0 {
            return Err(FinderError::InvalidOptions(
                "max_results must be at least 1".to_string(),
            ));
        }
        if self.min_engagement > 100 {
            return Err(FinderError::InvalidOptions(format!(
                "min_engagement must be within 0..=100, got {}",
                self.min_engagement
            )));
        }
        if self.min_problem_score > 100 {
            return Err(FinderError::InvalidOptions(format!(
                "min_problem_score must be within 0..=100, got {}",
                self.min_problem_score
            )));
        }
        Ok(())
    }
}

/// Progress of one search, in order. Emitted in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinderStage {
    Idle,
    QueryExpansion,
    MultiSourceFetch,
    Scoring,
    Filtering,
    Ranked,
}

impl FinderStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::QueryExpansion => "query_expansion",
            Self::MultiSourceFetch => "multi_source_fetch",
            Self::Scoring => "scoring",
            Self::Filtering => "filtering",
            Self::Ranked => "ranked",
        }
    }
}

impl fmt::Display for FinderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinderStats {
    /// Rounded mean over the ranked list; zero when it is empty.
    pub mean_engagement: u8,
    pub mean_problem_score: u8,
    pub duration_ms: u64,
    /// Unique posts admitted per platform, before filtering.
    pub posts_per_platform: BTreeMap<Platform, usize>,
    /// Every acquisition error, grouped by platform.
    pub errors: BTreeMap<Platform, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinderResult {
    pub query: String,
    /// Expansion queries in the order they were issued; the first is `query`.
    pub queries: Vec<String>,
    pub platforms: Vec<Platform>,
    /// Unique posts collected before filtering.
    pub total_posts: usize,
    pub ranked: Vec<ScoredPost>,
    /// High-confidence slice of `ranked`: engagement and problem both at least 20.
    pub top_problems: Vec<ScoredPost>,
    pub stats: FinderStats,
}
