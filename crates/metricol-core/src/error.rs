//! Core error types.

use metricol_proto::MetricKind;
use thiserror::Error;

/// Collector and storage errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Metric type is not a recognised kind.
    #[error("invalid metric type: {0}")]
    InvalidKind(String),

    /// No metric stored under this key.
    #[error("metric not found: {name} ({kind})")]
    NotFound { kind: MetricKind, name: String },

    /// The value's native type does not match the metric's kind.
    #[error("metric can't update: {name} ({kind})")]
    UpdateFailed { kind: MetricKind, name: String },

    /// A stored row whose populated column disagrees with its type.
    #[error("corrupt row for metric {id}: {reason}")]
    CorruptRow { id: String, reason: String },

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SQL error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(metricol_proto::Error),

    /// The store has been closed.
    #[error("store is closed")]
    Closed,
}

impl From<metricol_proto::Error> for Error {
    fn from(err: metricol_proto::Error) -> Self {
        match err {
            metricol_proto::Error::InvalidKind(kind) => Error::InvalidKind(kind),
            other => Error::Protocol(other),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
