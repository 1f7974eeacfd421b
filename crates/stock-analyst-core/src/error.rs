use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No records to analyze")]
    EmptyInput,

    #[error("Malformed record at index {index}: invalid {field}: {reason}")]
    MalformedRecord {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("Unexpected response status: '{0}'")]
    InvalidStatus(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    pub(crate) fn malformed(index: usize, field: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::MalformedRecord {
            index,
            field,
            reason: reason.into(),
        }
    }
}
