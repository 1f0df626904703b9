//! Agent error types.

use thiserror::Error;

/// Agent errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Local store error.
    #[error("store error: {0}")]
    Store(#[from] metricol_core::Error),

    /// Delivery failed: connection, timeout or non-success status.
    #[error("transport error: {0}")]
    Transport(String),

    /// Batch encoding error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, Error>;
