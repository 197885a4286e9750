//! Logging observer
//!
//! Default [`ISyncObserver`] that reports outcomes through `tracing`.

use tracing::{debug, info, warn};

use vaultpush_core::domain::{BatchResult, JobReport, Outcome};
use vaultpush_core::ports::ISyncObserver;

/// Writes one log line per job and a summary per batch
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl LogObserver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ISyncObserver for LogObserver {
    fn job_finished(&self, report: &JobReport) {
        let job = &report.job;
        match &report.outcome {
            Outcome::Uploaded => info!(
                bucket = %job.bucket,
                key = %job.key,
                attempts = report.attempts,
                "File uploaded"
            ),
            Outcome::Skipped => debug!(
                bucket = %job.bucket,
                key = %job.key,
                "File already current"
            ),
            Outcome::Failed(err) => warn!(
                bucket = %job.bucket,
                key = %job.key,
                attempts = report.attempts,
                error = %err,
                "File failed to sync"
            ),
        }
    }

    fn batch_finished(&self, result: &BatchResult) {
        let summary = result.summary();
        if summary.failed == 0 {
            info!(
                total = summary.total,
                uploaded = summary.uploaded,
                skipped = summary.skipped,
                duration_ms = summary.duration_ms,
                "Sync batch finished"
            );
        } else {
            warn!(
                total = summary.total,
                uploaded = summary.uploaded,
                skipped = summary.skipped,
                failed = summary.failed,
                duration_ms = summary.duration_ms,
                "Sync batch finished with failures"
            );
        }
    }
}
