//! Sync observer port
//!
//! Receives outcomes as the engine produces them. The engine calls these
//! hooks from worker tasks, so implementations must be cheap and
//! thread-safe. Observers cannot influence the sync; they only watch.

use crate::domain::outcome::{BatchResult, JobReport};

/// Port trait for reporting sync progress
pub trait ISyncObserver: Send + Sync {
    /// Called once per job after its outcome is final
    fn job_finished(&self, report: &JobReport);

    /// Called once per run after every job has finished
    fn batch_finished(&self, result: &BatchResult);
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ISyncObserver for NoopObserver {
    fn job_finished(&self, _report: &JobReport) {}

    fn batch_finished(&self, _result: &BatchResult) {}
}
