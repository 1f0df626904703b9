//! metricol agent.
//!
//! Polls host statistics into a local [`MemoryStore`](metricol_core::MemoryStore)
//! through a bounded [`WorkPool`], and periodically reports the store's
//! contents to a metricol server with retry and optional HMAC signing.
//!
//! # Modules
//!
//! - [`agent`] - Poll and report loops
//! - [`pool`] - Bounded worker pool
//! - [`reporter`] - Batch encoding, signing and delivery
//! - [`retry`] - Backoff schedule and delivery states
//! - [`stats`] - Host statistics sampling
//! - [`config`] - Command line and runtime configuration

pub mod agent;
pub mod config;
pub mod error;
pub mod pool;
pub mod reporter;
pub mod retry;
pub mod stats;

pub use agent::Agent;
pub use config::{AgentConfig, Args};
pub use error::{Error, Result};
pub use pool::{JobResult, Results, WorkPool};
pub use reporter::{Batch, HttpTransport, Reporter, Transport};
pub use retry::{Backoff, DeliveryReport, RetryState};
