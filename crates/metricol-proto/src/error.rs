//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The metric type is not one of the recognised kinds.
    #[error("invalid metric type: {0}")]
    InvalidKind(String),

    /// A record lacks the field its type requires.
    #[error("metric {id} ({kind}) has no value")]
    MissingValue { id: String, kind: String },

    /// A textual value could not be parsed for its kind.
    #[error("invalid value {value:?} for {kind}: {reason}")]
    InvalidValue {
        kind: String,
        value: String,
        reason: String,
    },

    /// The signature header is not valid hex.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
}
