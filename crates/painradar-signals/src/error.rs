use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinderError {
    #[error("invalid finder options: {0}")]
    InvalidOptions(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error on line {line}: {reason}")]
    Csv { line: usize, reason: String },
}
