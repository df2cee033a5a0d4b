use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("timed out after {secs}s while {operation}")]
    Timeout { operation: String, secs: u64 },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("browser driver error: {0}")]
    Driver(String),

    #[error("error page served at {url}")]
    ErrorPage { url: String },

    #[error("expected content missing at {url}")]
    MissingContent { url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("session is already closed")]
    SessionClosed,

    #[error("session pool has been shut down")]
    PoolClosed,

    #[error("search disabled: {0}")]
    SearchDisabled(String),
}
