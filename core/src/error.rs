//! Error types for scalebench-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Workload runner error
    #[error("workload error: {0}")]
    Workload(String),

    /// Metrics source error
    #[error("metrics error: {0}")]
    Metrics(String),

    /// Sink error (buffer state, not the underlying I/O)
    #[error("sink error: {0}")]
    Sink(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error talking to the metrics source
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Configuration error from any displayable message
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Configuration error for a missing required field
    pub fn missing_config(field: &str) -> Self {
        Error::Config(format!("missing required field: {field}"))
    }

    /// Workload error from any displayable message
    pub fn workload(msg: impl Into<String>) -> Self {
        Error::Workload(msg.into())
    }

    /// Metrics error from any displayable message
    pub fn metrics(msg: impl Into<String>) -> Self {
        Error::Metrics(msg.into())
    }

    /// Sink error from any displayable message
    pub fn sink(msg: impl Into<String>) -> Self {
        Error::Sink(msg.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
