//! Bounded worker pool.
//!
//! A fixed number of tasks pull jobs from a queue whose capacity equals the
//! worker count and post each job's [`JobResult`] to a results channel. The
//! results channel closes once every worker has exited, which happens when
//! the pool's [`CancelToken`] fires or after [`WorkPool::wait`] once the queue
//! drains.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use metricol_core::CancelToken;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Error;

type Job = Box<dyn FnOnce(CancelToken) -> BoxFuture<'static, JobResult> + Send>;

/// Receiving end of a pool's results.
pub type Results = mpsc::Receiver<JobResult>;

/// What a job reports back.
#[derive(Debug)]
pub struct JobResult {
    /// Short description of the job.
    pub message: String,
    /// Failure, if any.
    pub error: Option<Error>,
}

impl JobResult {
    /// A successful result.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }

    /// A failed result.
    pub fn failed(message: impl Into<String>, error: impl Into<Error>) -> Self {
        Self {
            message: message.into(),
            error: Some(error.into()),
        }
    }

    /// Whether the job succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Fixed-size pool of async workers.
pub struct WorkPool {
    jobs: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    cancel: CancelToken,
}

impl WorkPool {
    /// Start `size` workers. Must be called inside a Tokio runtime.
    pub fn new(size: usize, cancel: CancelToken) -> (Self, Results) {
        let size = size.max(1);
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>(size);
        let (results_tx, results_rx) = mpsc::channel(size);
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));

        let workers = (0..size)
            .map(|id| {
                tokio::spawn(worker(
                    id,
                    Arc::clone(&jobs_rx),
                    results_tx.clone(),
                    cancel.clone(),
                ))
            })
            .collect();

        let pool = Self {
            jobs: jobs_tx,
            workers,
            cancel,
        };
        (pool, results_rx)
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job.
    ///
    /// Waits while the queue is full. Returns `false`, dropping the job, if
    /// the pool is cancelled first.
    pub async fn schedule<F, Fut>(&self, job: F) -> bool
    where
        F: FnOnce(CancelToken) -> Fut + Send + 'static,
        Fut: Future<Output = JobResult> + Send + 'static,
    {
        let job: Job = Box::new(move |cancel| Box::pin(job(cancel)));
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.jobs.send(job) => sent.is_ok(),
        }
    }

    /// Stop accepting jobs and wait for every worker to exit.
    ///
    /// Without cancellation, queued jobs are run first.
    pub async fn wait(self) {
        drop(self.jobs);
        for handle in self.workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker task failed");
            }
        }
    }
}

async fn worker(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    results: mpsc::Sender<JobResult>,
    cancel: CancelToken,
) {
    loop {
        let job = {
            let mut jobs = jobs.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                job = jobs.recv() => job,
            }
        };
        let Some(job) = job else {
            break;
        };

        let result = job(cancel.clone()).await;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = results.send(result) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    debug!(worker = id, "Worker stopped");
}
