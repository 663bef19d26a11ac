use thiserror::Error;

/// Failure modes shared by the analyzers and the provider clients.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Too few bars or no usable fields for the requested section
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Provider payload that could not be decoded or holds impossible values
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    ApiError(String),

    /// Provider kept answering HTTP 429 after every retry
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
