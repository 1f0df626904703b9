//! metricol wire protocol.
//!
//! This crate defines what travels between the agent, the server and the
//! on-disk snapshot: the metric kind vocabulary, the flat JSON record and the
//! HMAC-SHA256 signature carried in the [`HASH_HEADER`] header.
//!
//! # Modules
//!
//! - [`kind`] - The closed set of metric kinds
//! - [`record`] - JSON records exchanged over HTTP and stored in snapshots
//! - [`hash`] - Body signing and verification
//! - [`error`] - Protocol error types
//!
//! # Example
//!
//! ```
//! use metricol_proto::{hash, MetricRecord};
//!
//! let batch = vec![MetricRecord::counter("PollCount", 5), MetricRecord::gauge("Alloc", 1.5)];
//! let body = serde_json::to_vec(&batch).unwrap();
//! let signature = hash::sign(b"secret", &body);
//! assert!(hash::verify(b"secret", &body, &signature));
//! ```

pub mod error;
pub mod hash;
pub mod kind;
pub mod record;

pub use error::Error;
pub use kind::{MetricKind, ScalarValue};
pub use record::MetricRecord;

/// Header carrying the hex-encoded HMAC-SHA256 of a request or response body.
pub const HASH_HEADER: &str = "HashSHA256";
