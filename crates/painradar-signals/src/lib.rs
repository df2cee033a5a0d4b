//! Problem discovery over acquired posts.
//!
//! Expands a topic into problem-flavoured queries, fans them out through the
//! scraper orchestrator, scores every unique post for engagement and problem
//! language, and ranks what survives the caller's thresholds. Aggregation and
//! export helpers for raw acquisition results live here too.

pub mod aggregate;
pub mod error;
pub mod expansion;
pub mod export;
pub mod finder;
pub mod report;
pub mod scorer;
pub mod types;

pub use error::{ExportError, FinderError};
pub use expansion::{expand_queries, expand_queries_with};
pub use finder::ProblemFinder;
pub use scorer::{engagement_score, problem_score, total_score, Scorer};
pub use types::{FindOptions, FinderResult, FinderStage, FinderStats, ScoreBreakdown, ScoredPost};
