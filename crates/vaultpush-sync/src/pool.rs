//! Bounded worker pool
//!
//! Fans jobs from a [`JobSource`] out to a fixed number of upload workers
//! through a bounded MPMC queue, and collects one [`JobReport`] per job.
//!
//! ```text
//! JobSource ──→ producer ──→ async_channel (buffer M) ──→ N workers ──→ reports
//!                  │ blocks when full                        │
//!                  └── stops on cancel / source error        └── observer.job_finished
//! ```
//!
//! Every pool is created for one batch and torn down before
//! [`run_batch`] returns: the queue is closed and every worker task is
//! joined. On cancellation the queued jobs are still drained; after a
//! source error they are discarded and only in-flight uploads finish.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vaultpush_core::config::WorkersConfig;
use vaultpush_core::domain::{JobReport, SyncJob};
use vaultpush_core::ports::ISyncObserver;

use crate::retry::Uploader;
use crate::SyncError;

/// Pool dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub num_workers: usize,
    pub buffer_size: usize,
}

impl PoolConfig {
    /// Zero values are raised to one.
    #[must_use]
    pub fn new(num_workers: usize, buffer_size: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
            buffer_size: buffer_size.max(1),
        }
    }

    #[must_use]
    pub fn from_config(workers: &WorkersConfig) -> Self {
        Self::new(workers.num_workers, workers.buffer_size)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_config(&WorkersConfig::default())
    }
}

/// A lazily produced sequence of jobs
///
/// An `Err` from `next_job` is an enumeration failure: fatal for the batch.
#[async_trait::async_trait]
pub trait JobSource: Send {
    async fn next_job(&mut self) -> Result<Option<SyncJob>, SyncError>;
}

#[async_trait::async_trait]
impl JobSource for VecDeque<SyncJob> {
    async fn next_job(&mut self) -> Result<Option<SyncJob>, SyncError> {
        Ok(self.pop_front())
    }
}

#[async_trait::async_trait]
impl JobSource for std::vec::IntoIter<SyncJob> {
    async fn next_job(&mut self) -> Result<Option<SyncJob>, SyncError> {
        Ok(self.next())
    }
}

/// Runs every job from `source` through `uploader` with bounded concurrency
///
/// Returns only after all workers have exited. On success each submitted
/// job has exactly one report.
///
/// Cancellation stops submission; jobs already queued still run, then
/// [`SyncError::Cancelled`] is returned. A source error is fatal: workers
/// start no further jobs, uploads already in flight are joined and the
/// error is returned.
#[tracing::instrument(skip_all, fields(workers = config.num_workers, buffer = config.buffer_size))]
pub async fn run_batch<S>(
    mut source: S,
    uploader: Arc<Uploader>,
    observer: Arc<dyn ISyncObserver>,
    config: PoolConfig,
    cancel: CancellationToken,
) -> Result<Vec<JobReport>, SyncError>
where
    S: JobSource,
{
    let (tx, rx) = async_channel::bounded::<SyncJob>(config.buffer_size);
    // Set when the batch has already failed; queued jobs are abandoned
    let abandon = CancellationToken::new();

    let mut workers = JoinSet::new();
    for worker_id in 0..config.num_workers {
        let rx = rx.clone();
        let uploader = Arc::clone(&uploader);
        let observer = Arc::clone(&observer);
        let abandon = abandon.clone();
        workers.spawn(async move {
            let mut reports = Vec::new();
            while let Ok(job) = rx.recv().await {
                if abandon.is_cancelled() {
                    break;
                }
                let report = uploader.upload_with_retry(&job).await;
                observer.job_finished(&report);
                reports.push(report);
            }
            debug!(worker_id, jobs = reports.len(), "Worker finished");
            reports
        });
    }
    drop(rx);

    // Producer runs on this task while workers drain the queue
    let mut submitted = 0usize;
    let produced: Result<(), SyncError> = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Err(SyncError::Cancelled),
            next = source.next_job() => next,
        };
        let job = match next {
            Ok(Some(job)) => job,
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        };
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Err(SyncError::Cancelled),
            sent = tx.send(job) => sent,
        };
        if sent.is_err() {
            break Err(SyncError::Worker("all workers exited early".to_string()));
        }
        submitted += 1;
    };
    match &produced {
        Ok(()) => debug!(submitted, "All jobs submitted"),
        Err(SyncError::Cancelled) => warn!(submitted, "Job submission cancelled"),
        Err(err) => {
            abandon.cancel();
            let discarded = tx.len();
            warn!(submitted, discarded, error = %err, "Job submission failed, abandoning queued jobs");
        }
    }
    tx.close();

    let mut reports = Vec::with_capacity(submitted);
    let mut worker_failure = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(mut batch) => reports.append(&mut batch),
            Err(err) => worker_failure = Some(SyncError::Worker(err.to_string())),
        }
    }

    produced?;
    if let Some(err) = worker_failure {
        return Err(err);
    }

    info!(jobs = reports.len(), "Batch complete");
    Ok(reports)
}
