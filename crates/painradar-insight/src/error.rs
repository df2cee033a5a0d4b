use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected HTTP status {status} from model {model}: {body}")]
    UnexpectedStatus {
        status: u16,
        model: String,
        body: String,
    },

    /// Every model in the fallback list failed; one entry per model tried.
    #[error("all models failed: {}", errors.join("; "))]
    AllModelsFailed { errors: Vec<String> },

    /// The endpoint rejected the API key for one model.
    #[error("completion endpoint rejected the API key (HTTP 401)")]
    Unauthorized,
}
