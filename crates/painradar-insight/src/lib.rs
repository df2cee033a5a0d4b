//! Problem summaries from an OpenAI-compatible chat completion endpoint.
//!
//! The top scored posts of a problem search are condensed into one prompt and
//! sent through an ordered list of models, falling back to the next model on
//! any failure. The reply is parsed into an [`InsightReport`]; replies that
//! are not valid JSON degrade to a report carrying the raw text.

pub mod client;
pub mod error;
pub mod parse;
pub mod prompt;
pub mod report;
pub mod types;

pub use client::Summarizer;
pub use error::InsightError;
pub use parse::parse_structured;
pub use report::format_report;
pub use types::{InsightReport, ProblemCategory};
