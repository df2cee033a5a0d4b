use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemCategory {
    pub name: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// A summary of the problems behind a set of posts.
///
/// `structured` is false when the model reply could not be parsed; the
/// summary then holds the start of the raw reply and the lists are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightReport {
    pub topic: String,
    /// Model that produced the reply, if a request was made.
    pub model: Option<String>,
    pub structured: bool,
    pub summary: String,
    pub categories: Vec<ProblemCategory>,
    pub top_insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub raw: String,
}

impl InsightReport {
    /// The report for an empty post list; no request is made for it.
    #[must_use]
    pub fn empty(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            structured: true,
            summary: "No data to analyze.".to_string(),
            ..Self::default()
        }
    }
}
