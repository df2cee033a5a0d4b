//! Problem search across platforms.
//!
//! One search walks the [`FinderStage`]s in order: the topic is expanded into
//! query variants, every variant is searched on every target platform, unique
//! posts are scored, filtered by the caller's thresholds and ranked.
//!
//! Variants are fetched concurrently but their results are consumed in
//! variant order by this task alone, so URL deduplication has a single writer
//! and the discovery order used to break ranking ties is deterministic.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use painradar_core::{Platform, Post, ProblemLexicon, RadarConfig, Target};
use painradar_scraper::extract::normalize_url;
use painradar_scraper::Orchestrator;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::FinderError;
use crate::expansion::expand_queries_with;
use crate::scorer::Scorer;
use crate::types::{FindOptions, FinderResult, FinderStage, FinderStats, ScoredPost};

const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 2;
const TOP_PROBLEM_MIN_ENGAGEMENT: u8 = 20;
const TOP_PROBLEM_MIN_PROBLEM: u8 = 20;
const TOP_PROBLEM_LIMIT: usize = 10;

pub struct ProblemFinder {
    orchestrator: Orchestrator,
    scorer: Scorer,
    max_concurrent_queries: usize,
    seed: Option<u64>,
}

/// Unique posts gathered over all variants, with per-platform bookkeeping.
#[derive(Default)]
struct Collected {
    posts: Vec<Post>,
    per_platform: BTreeMap<Platform, usize>,
    errors: BTreeMap<Platform, Vec<String>>,
}

impl ProblemFinder {
    #[must_use]
    pub fn new(orchestrator: Orchestrator, lexicon: ProblemLexicon) -> Self {
        Self {
            orchestrator,
            scorer: Scorer::new(lexicon),
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
            seed: None,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the orchestrator cannot be built from `cfg`.
    pub fn from_config(cfg: &RadarConfig) -> Result<Self, painradar_scraper::AcquireError> {
        Ok(Self::new(Orchestrator::from_config(cfg)?, cfg.lexicon.clone()))
    }

    #[must_use]
    pub fn with_max_concurrent_queries(mut self, max: usize) -> Self {
        self.max_concurrent_queries = max.max(1);
        self
    }

    /// Fixes the expansion RNG so variant selection is reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    fn expand(&self, topic: &str, k: usize) -> Vec<String> {
        let modifiers = &self.scorer.lexicon().modifiers;
        match self.seed {
            Some(seed) => expand_queries_with(topic, modifiers, k, &mut StdRng::seed_from_u64(seed)),
            None => expand_queries_with(topic, modifiers, k, &mut rand::rng()),
        }
    }

    /// Runs one problem search.
    ///
    /// Acquisition failures never fail the search; they are reported in
    /// `stats.errors`.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidOptions`] for a blank topic or invalid
    /// options, before any request is made.
    pub async fn find_problems(
        &self,
        topic: &str,
        targets: &[Target],
        options: FindOptions,
    ) -> Result<FinderResult, FinderError> {
        options.validate()?;
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(FinderError::InvalidOptions(
                "topic must not be empty".to_string(),
            ));
        }
        let started = Instant::now();
        let platforms = self.orchestrator.resolve(targets);
        tracing::debug!(stage = %FinderStage::Idle, topic, ?platforms, "problem search requested");

        tracing::debug!(stage = %FinderStage::QueryExpansion, max_variations = options.max_variations);
        let queries = self.expand(topic, options.max_variations);
        tracing::info!(topic, ?queries, "expanded topic");

        tracing::debug!(stage = %FinderStage::MultiSourceFetch, queries = queries.len());
        let collected = self.collect(&queries, &platforms).await;
        let total_posts = collected.posts.len();
        tracing::info!(topic, total_posts, "collected unique posts");

        tracing::debug!(stage = %FinderStage::Scoring, posts = total_posts);
        let scored = self.scorer.score_all(collected.posts);

        tracing::debug!(
            stage = %FinderStage::Filtering,
            min_engagement = options.min_engagement,
            min_problem_score = options.min_problem_score
        );
        let mut ranked: Vec<ScoredPost> = scored
            .into_iter()
            .filter(|p| {
                p.engagement_score >= options.min_engagement
                    && p.problem_score >= options.min_problem_score
            })
            .collect();
        ranked.sort_by(|a, b| b.total_score.cmp(&a.total_score));
        ranked.truncate(options.max_results);

        let top_problems: Vec<ScoredPost> = ranked
            .iter()
            .filter(|p| {
                p.engagement_score >= TOP_PROBLEM_MIN_ENGAGEMENT
                    && p.problem_score >= TOP_PROBLEM_MIN_PROBLEM
            })
            .take(TOP_PROBLEM_LIMIT)
            .cloned()
            .collect();

        let stats = FinderStats {
            mean_engagement: rounded_mean(ranked.iter().map(|p| p.engagement_score)),
            mean_problem_score: rounded_mean(ranked.iter().map(|p| p.problem_score)),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            posts_per_platform: collected.per_platform,
            errors: collected.errors,
        };
        tracing::debug!(
            stage = %FinderStage::Ranked,
            ranked = ranked.len(),
            top_problems = top_problems.len(),
            duration_ms = stats.duration_ms
        );

        Ok(FinderResult {
            query: topic.to_string(),
            queries,
            platforms,
            total_posts,
            ranked,
            top_problems,
            stats,
        })
    }

    /// Searches every variant on every platform and keeps the first post seen
    /// for each normalized URL.
    async fn collect(&self, queries: &[String], platforms: &[Platform]) -> Collected {
        let targets: Vec<Target> = platforms.iter().copied().map(Target::One).collect();
        let mut fetches = stream::iter(queries)
            .map(|query| {
                let targets = &targets;
                async move {
                    let results = self.orchestrator.fetch_by_search(query, targets).await;
                    (query, results)
                }
            })
            .buffered(self.max_concurrent_queries);

        let mut seen: HashSet<String> = HashSet::new();
        let mut collected = Collected::default();
        while let Some((query, results)) = fetches.next().await {
            for (platform, result) in results {
                let mut admitted = 0;
                for post in result.posts {
                    if seen.insert(normalize_url(&post.url)) {
                        collected.posts.push(post);
                        admitted += 1;
                    }
                }
                *collected.per_platform.entry(platform).or_default() += admitted;
                if !result.errors.is_empty() {
                    collected
                        .errors
                        .entry(platform)
                        .or_default()
                        .extend(result.errors);
                }
                tracing::debug!(platform = %platform, query = %query, admitted, "variant results merged");
            }
        }
        collected
    }
}

fn rounded_mean(values: impl Iterator<Item = u8>) -> u8 {
    let (sum, count) = values.fold((0_u64, 0_u64), |(s, c), v| (s + u64::from(v), c + 1));
    if count == 0 {
        return 0;
    }
    // Half-up rounding of sum / count.
    u8::try_from((sum * 2 + count) / (count * 2)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_rounds_half_up() {
        assert_eq!(rounded_mean(std::iter::empty()), 0);
        assert_eq!(rounded_mean([10, 11].into_iter()), 11);
        assert_eq!(rounded_mean([10, 10, 11].into_iter()), 10);
        assert_eq!(rounded_mean([100, 100].into_iter()), 100);
    }
}
