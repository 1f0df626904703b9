//! Agent configuration.

use std::time::Duration;

use clap::Parser;

use crate::error::{Error, Result};
use crate::retry::Backoff;

/// metricol agent command line arguments.
#[derive(Debug, Parser)]
#[command(name = "metricol-agent")]
#[command(about = "Polls host statistics and reports them to a metricol server")]
pub struct Args {
    /// Address of the metricol server.
    #[arg(short, long, env = "ADDRESS", default_value = "localhost:8080")]
    pub address: String,

    /// Seconds between reports.
    #[arg(short, long, env = "REPORT_INTERVAL", default_value_t = 10)]
    pub report_interval: u64,

    /// Seconds between polls.
    #[arg(short, long, env = "POLL_INTERVAL", default_value_t = 2)]
    pub poll_interval: u64,

    /// Shared HMAC-SHA256 key. Empty disables signing.
    #[arg(short, long, env = "KEY", default_value = "")]
    pub key: String,

    /// Number of concurrent poll workers.
    #[arg(short = 'l', long, env = "RATE_LIMIT", default_value_t = 4)]
    pub rate_limit: usize,

    /// Delivery attempts per report, including the first.
    #[arg(long, default_value_t = 10)]
    pub max_attempts: u32,

    /// Smallest delay (ms) between delivery attempts.
    #[arg(long, default_value_t = 100)]
    pub min_backoff_ms: u64,

    /// Largest delay (ms) between delivery attempts.
    #[arg(long, default_value_t = 1000)]
    pub max_backoff_ms: u64,

    /// Per-request timeout (ms).
    #[arg(long, default_value_t = 5000)]
    pub request_timeout_ms: u64,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, env = "LOG_LVL", default_value = "info")]
    pub log_level: String,
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Address of the metricol server (`host:port`).
    pub address: String,
    /// Time between reports.
    pub report_interval: Duration,
    /// Time between polls.
    pub poll_interval: Duration,
    /// Shared HMAC key.
    pub key: Option<String>,
    /// Number of concurrent poll workers.
    pub rate_limit: usize,
    /// Delivery attempts per report.
    pub max_attempts: u32,
    /// Delay schedule between attempts.
    pub backoff: Backoff,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl AgentConfig {
    /// Default configuration for the given server address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Set the report interval.
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the shared key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the worker count.
    pub fn with_rate_limit(mut self, rate_limit: usize) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set the attempt cap.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the backoff schedule.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Reject values the agent cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.report_interval.is_zero() {
            return Err(Error::Config("report interval must be positive".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".into()));
        }
        if self.rate_limit == 0 {
            return Err(Error::Config("rate limit must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max attempts must be at least 1".into()));
        }
        if self.backoff.min > self.backoff.max {
            return Err(Error::Config("min backoff cannot exceed max backoff".into()));
        }
        Ok(())
    }
}

impl TryFrom<&Args> for AgentConfig {
    type Error = Error;

    fn try_from(args: &Args) -> Result<Self> {
        let config = Self {
            address: args.address.clone(),
            report_interval: Duration::from_secs(args.report_interval),
            poll_interval: Duration::from_secs(args.poll_interval),
            key: Some(args.key.clone()).filter(|k| !k.is_empty()),
            rate_limit: args.rate_limit,
            max_attempts: args.max_attempts,
            backoff: Backoff::new(
                Duration::from_millis(args.min_backoff_ms),
                Duration::from_millis(args.max_backoff_ms),
            ),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            address: "localhost:8080".to_string(),
            report_interval: Duration::from_secs(10),
            poll_interval: Duration::from_secs(2),
            key: None,
            rate_limit: 4,
            max_attempts: 10,
            backoff: Backoff::default(),
            request_timeout: Duration::from_secs(5),
        }
    }
}
