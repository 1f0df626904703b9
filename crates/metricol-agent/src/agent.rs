//! Agent runtime: the poll loop, the report loop and the pool feeding the store.

use std::sync::Arc;

use metricol_core::{CancelToken, Collector, MemoryStore, Metric};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::error::Result;
use crate::pool::{JobResult, Results, WorkPool};
use crate::reporter::{HttpTransport, Reporter, Transport};
use crate::stats::HostStats;

/// A running agent's components.
pub struct Agent {
    config: AgentConfig,
    store: Arc<MemoryStore>,
    reporter: Reporter,
}

impl Agent {
    /// Build an agent reporting over HTTP.
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.address, config.request_timeout)?;
        info!(url = transport.url(), "Reporting to server");
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build an agent reporting through `transport`.
    pub fn with_transport(config: AgentConfig, transport: Arc<dyn Transport>) -> Self {
        let mut reporter = Reporter::new(transport)
            .with_backoff(config.backoff)
            .with_max_attempts(config.max_attempts);
        if let Some(key) = &config.key {
            reporter = reporter.with_key(key.as_bytes());
        }

        Self {
            config,
            store: Arc::new(MemoryStore::new()),
            reporter,
        }
    }

    /// The agent's local store.
    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    /// Poll and report until `cancel` fires, then wait for the workers.
    pub async fn run(&self, cancel: CancelToken) {
        let (pool, results) = WorkPool::new(self.config.rate_limit, cancel.clone());
        let drainer = tokio::spawn(drain_results(results));

        info!(
            poll_interval_s = self.config.poll_interval.as_secs_f64(),
            report_interval_s = self.config.report_interval.as_secs_f64(),
            workers = pool.size(),
            "Agent started"
        );

        tokio::join!(self.poll_loop(&pool, &cancel), self.report_loop(&cancel));

        pool.wait().await;
        if let Err(e) = drainer.await {
            warn!(error = %e, "Result drainer failed");
        }
        info!("Agent stopped");
    }

    async fn poll_loop(&self, pool: &WorkPool, cancel: &CancelToken) {
        let mut stats = HostStats::new();
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let sample = stats.sample();
            debug!(metrics = sample.len(), "Polled host statistics");
            for metric in sample {
                if !pool.schedule(update_job(Arc::clone(&self.store), metric)).await {
                    return;
                }
            }
        }
    }

    async fn report_loop(&self, cancel: &CancelToken) {
        let period = self.config.report_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.reporter.report(self.store.as_ref(), cancel).await {
                Ok(Some(report)) => debug!(
                    delivered = report.delivered(),
                    attempts = report.attempts,
                    "Report finished"
                ),
                Ok(None) => debug!("Nothing to report"),
                Err(e) => warn!(error = %e, "Report failed"),
            }
        }
    }
}

fn update_job(
    store: Arc<MemoryStore>,
    metric: Metric,
) -> impl FnOnce(CancelToken) -> std::future::Ready<JobResult> + Send + 'static {
    move |_cancel| {
        let result = match store.update_metric(metric.kind(), metric.name(), metric.value()) {
            Ok(()) => JobResult::ok(format!("updated {}", metric.name())),
            Err(e) => JobResult::failed(format!("update {}", metric.name()), e),
        };
        std::future::ready(result)
    }
}

async fn drain_results(mut results: Results) {
    while let Some(result) = results.recv().await {
        match &result.error {
            Some(e) => warn!(job = %result.message, error = %e, "Job failed"),
            None => debug!(job = %result.message, "Job finished"),
        }
    }
}
