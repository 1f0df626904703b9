//! metricol core.
//!
//! The metric model, the [`Collector`] contract and its storage backends.
//!
//! # Modules
//!
//! - [`metric`] - Metric values and the merge rule
//! - [`collector`] - The storage contract
//! - [`storage`] - Memory, file-backed and SQLite backends
//! - [`snapshot`] - JSON snapshot files
//! - [`cancel`] - Cooperative cancellation and shutdown signals
//! - [`error`] - Error types

pub mod cancel;
pub mod collector;
pub mod error;
pub mod metric;
pub mod snapshot;
pub mod storage;

pub use cancel::{shutdown_signal, CancelToken};
pub use collector::Collector;
pub use error::{Error, Result};
pub use metric::{Metric, MetricValue};
pub use storage::{DatabaseStore, FileStore, FileStoreConfig, MemoryStore};

pub use metricol_proto::{MetricKind, ScalarValue};
