//! Report delivery.
//!
//! Each report snapshots the local store, encodes the snapshot as a JSON
//! array of records, optionally signs it, and delivers it through a
//! [`Transport`] with bounded retry. A batch that cannot be delivered is
//! dropped; nothing carries over to the next report.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metricol_core::{CancelToken, Collector, Metric, MetricKind, MetricValue, ScalarValue};
use metricol_proto::{hash, MetricRecord, HASH_HEADER};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::retry::{Backoff, DeliveryReport, RetryState};

/// Sends an encoded batch to the server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `body`, with `signature` in the hash header when present.
    async fn send(&self, body: &[u8], signature: Option<&str>) -> Result<()>;
}

/// HTTP transport posting to `http://{address}/updates/`.
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    /// Build a transport for the server at `address` (`host:port`).
    pub fn new(address: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: format!("http://{address}/updates/"),
        })
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: &[u8], signature: Option<&str>) -> Result<()> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec());
        if let Some(signature) = signature {
            request = request.header(HASH_HEADER, signature);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("server responded {status}")));
        }
        Ok(())
    }
}

/// Encoded batch ready for delivery.
#[derive(Debug, Clone)]
pub struct Batch {
    /// JSON array of records.
    pub body: Vec<u8>,
    /// Hex HMAC of `body`, when a key is set.
    pub signature: Option<String>,
}

/// Snapshots, signs and delivers metrics.
pub struct Reporter {
    transport: Arc<dyn Transport>,
    key: Option<Vec<u8>>,
    backoff: Backoff,
    max_attempts: u32,
}

impl Reporter {
    /// Reporter with default backoff and 10 attempts, unsigned.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            key: None,
            backoff: Backoff::default(),
            max_attempts: 10,
        }
    }

    /// Sign batches with `key`.
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the delay schedule.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the attempt cap, counting the first attempt.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Encode and sign a snapshot.
    pub fn encode(&self, metrics: &[Metric]) -> Result<Batch> {
        let records: Vec<MetricRecord> = metrics.iter().map(Metric::to_record).collect();
        let body = serde_json::to_vec(&records)?;
        let signature = self.key.as_deref().map(|key| hash::sign(key, &body));
        Ok(Batch { body, signature })
    }

    /// Deliver one batch, retrying failed attempts until the cap or cancellation.
    pub async fn deliver(&self, batch: &Batch, cancel: &CancelToken) -> DeliveryReport {
        let mut state = RetryState::Idle;
        let mut attempts = 0;
        let mut delays = Vec::new();

        while !state.is_terminal() {
            state = match state {
                RetryState::Idle => RetryState::Attempting(1),
                RetryState::Attempting(attempt) => {
                    let sent = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        sent = self.transport.send(&batch.body, batch.signature.as_deref()) => Some(sent),
                    };
                    match sent {
                        None => RetryState::Cancelled,
                        Some(Ok(())) => {
                            attempts = attempt;
                            RetryState::Delivered(attempt)
                        }
                        Some(Err(e)) => {
                            attempts = attempt;
                            let next =
                                RetryState::after_failure(attempt, self.max_attempts, &self.backoff);
                            if let RetryState::Backoff(_, delay) = next {
                                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Delivery attempt failed");
                            } else {
                                warn!(attempt, error = %e, "Delivery attempt failed");
                            }
                            next
                        }
                    }
                }
                RetryState::Backoff(attempt, delay) => {
                    delays.push(delay);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => RetryState::Cancelled,
                        _ = tokio::time::sleep(delay) => RetryState::Attempting(attempt + 1),
                    }
                }
                terminal => terminal,
            };
        }

        match state {
            RetryState::Delivered(_) => debug!(attempts, bytes = batch.body.len(), "Batch delivered"),
            RetryState::Exhausted(_) => warn!(attempts, "Delivery attempts exhausted, dropping batch"),
            _ => debug!(attempts, "Delivery cancelled"),
        }

        DeliveryReport {
            state,
            attempts,
            delays,
        }
    }

    /// Report the contents of `store`.
    ///
    /// Returns `None` when the store is empty. Counter values included in the
    /// batch are subtracted from the store afterwards, delivered or not, so
    /// each report carries only increments since the previous one. A
    /// cancelled delivery leaves the store untouched.
    pub async fn report(
        &self,
        store: &dyn Collector,
        cancel: &CancelToken,
    ) -> Result<Option<DeliveryReport>> {
        let metrics = store.get_all_metrics()?;
        if metrics.is_empty() {
            return Ok(None);
        }

        let batch = self.encode(&metrics)?;
        let report = self.deliver(&batch, cancel).await;

        if report.state != RetryState::Cancelled {
            for metric in &metrics {
                if let MetricValue::Counter(sent) = metric.metric_value() {
                    store.update_metric(
                        MetricKind::Counter,
                        metric.name(),
                        ScalarValue::Int(sent.wrapping_neg()),
                    )?;
                }
            }
        }

        Ok(Some(report))
    }
}
