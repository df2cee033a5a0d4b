//! Shared data model, configuration and retry policy for the Pain Radar engine.

pub mod config;
pub mod lexicon;
pub mod retry;
pub mod types;

pub use config::{load_config, load_config_from_env, DriverKind, RadarConfig};
pub use lexicon::{ModifierSet, ProblemLexicon};
pub use retry::{RetryDecision, RetryFailure, RetryPolicy};
pub use types::{
    expand_targets, AcquisitionResult, AcquisitionStats, Platform, Post, Profile, Target,
    DEFAULT_PLATFORMS,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("failed to load lexicon from {path}: {reason}")]
    Lexicon { path: String, reason: String },
}
