//! Job outcomes and batch aggregation
//!
//! Every submitted [`SyncJob`](super::job::SyncJob) produces exactly one
//! [`JobReport`]. A [`BatchResult`] collects them; it is successful iff no
//! report carries [`Outcome::Failed`].

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::job::JobId;

// ============================================================================
// Per-job outcome
// ============================================================================

/// Why a single job could not be synced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The local file could not be read; never retried
    #[error("failed to fingerprint {path}: {message}")]
    Fingerprint { path: PathBuf, message: String },

    /// The local file became unreadable while its upload was being sent
    #[error("failed to read {path} for upload: {message}")]
    LocalRead { path: PathBuf, message: String },

    /// The store rejected the request with a non-retryable error
    #[error("rejected after {attempts} attempt(s): {cause}")]
    Rejected { attempts: u32, cause: String },

    /// Every attempt in the retry budget failed
    #[error("failed after {attempts} attempt(s): {cause}")]
    RetriesExhausted { attempts: u32, cause: String },
}

/// Final state of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Content was written to the store
    Uploaded,
    /// The store already held identical content
    Skipped,
    /// The job could not be completed
    Failed(JobError),
}

impl Outcome {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Outcome::Uploaded => "uploaded",
            Outcome::Skipped => "skipped",
            Outcome::Failed(_) => "failed",
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Failed(err) => write!(f, "failed: {err}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Outcome of one job plus how many store attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job: JobId,
    pub outcome: Outcome,
    /// Number of attempts started (0 when the job failed before contacting the store)
    pub attempts: u32,
}

// ============================================================================
// Batch aggregation
// ============================================================================

/// Collection of per-job outcomes for one sync invocation
///
/// Ordering of reports carries no meaning; uploads complete in any order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    reports: Vec<JobReport>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

/// Serializable counters describing a finished batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_ms: i64,
}

impl BatchResult {
    #[must_use]
    pub fn new(reports: Vec<JobReport>, started_at: DateTime<Utc>) -> Self {
        Self {
            reports,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// A batch in which no job was submitted
    #[must_use]
    pub fn empty(started_at: DateTime<Utc>) -> Self {
        Self::new(Vec::new(), started_at)
    }

    #[must_use]
    pub fn reports(&self) -> &[JobReport] {
        &self.reports
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Looks up the outcome recorded for `job`
    #[must_use]
    pub fn outcome_of(&self, job: &JobId) -> Option<&Outcome> {
        self.reports
            .iter()
            .find(|r| &r.job == job)
            .map(|r| &r.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobReport> {
        self.reports.iter().filter(|r| r.outcome.is_failed())
    }

    fn count(&self, wanted: fn(&Outcome) -> bool) -> usize {
        self.reports.iter().filter(|r| wanted(&r.outcome)).count()
    }

    #[must_use]
    pub fn uploaded_count(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Uploaded))
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped))
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(Outcome::is_failed)
    }

    /// True iff no job failed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.len(),
            uploaded: self.uploaded_count(),
            skipped: self.skipped_count(),
            failed: self.failed_count(),
            duration_ms: (self.finished_at - self.started_at).num_milliseconds(),
        }
    }

    /// Converts into an aggregate error when any job failed
    ///
    /// # Errors
    /// Returns [`BatchError`] carrying the whole result if at least one
    /// report is `Failed`
    pub fn into_result(self) -> Result<Self, BatchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(BatchError { result: self })
        }
    }
}

/// Aggregate error for a batch with one or more failed jobs
///
/// The message lists every failing job identity and its cause.
#[derive(Debug, Clone)]
pub struct BatchError {
    result: BatchResult,
}

impl BatchError {
    /// The full batch, including successful outcomes
    #[must_use]
    pub fn result(&self) -> &BatchResult {
        &self.result
    }

    #[must_use]
    pub fn into_result(self) -> BatchResult {
        self.result
    }

    /// Identities of every failed job
    #[must_use]
    pub fn failed_jobs(&self) -> Vec<&JobId> {
        self.result.failures().map(|r| &r.job).collect()
    }
}

impl Display for BatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} file(s) failed to sync",
            self.result.failed_count(),
            self.result.len()
        )?;
        for report in self.result.failures() {
            if let Outcome::Failed(err) = &report.outcome {
                write!(f, "\n  - {}: {err}", report.job)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}

// ============================================================================
// Tests
// ============================================================================
