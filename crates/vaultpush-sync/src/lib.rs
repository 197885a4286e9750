//! vaultpush Sync - Content-addressed push synchronization engine
//!
//! Provides:
//! - Streaming SHA-256 fingerprints of local files
//! - Lazy tree walking with a declared path policy
//! - Directory-name based bucket routing
//! - Dedup against the digest stored with each remote object
//! - Bounded-retry uploads through a bounded worker pool
//!
//! ## Modules
//!
//! - [`engine`] - `SyncEngine::run_sync` orchestrating one batch
//! - [`pool`] - bounded worker pool with backpressure
//! - [`retry`] - per-job upload loop
//! - [`walker`] / [`router`] / [`dedup`] / [`fingerprint`] - building blocks
//! - [`source`] - local directory and git checkout providers
//! - [`observer`] - `tracing`-backed sync observer

pub mod dedup;
pub mod engine;
pub mod fingerprint;
pub mod observer;
pub mod pool;
pub mod retry;
pub mod router;
pub mod source;
pub mod walker;

use thiserror::Error;

use vaultpush_core::domain::{BatchError, DomainError};

pub use engine::{EngineSettings, SyncEngine};
pub use observer::LogObserver;
pub use walker::WalkError;

/// Errors that end a sync batch as a whole
///
/// Failures of individual files are not `SyncError`s on their own; they are
/// collected into [`SyncError::Batch`] once every job has finished.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The source provider could not produce the local tree
    #[error("source tree unavailable: {0}")]
    SourceUnavailable(String),

    /// Enumerating the tree failed; no partial batch is reported
    #[error("enumeration failed: {0}")]
    Enumeration(#[from] WalkError),

    /// Engine settings are inconsistent
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] DomainError),

    /// One or more files failed to sync
    #[error("{0}")]
    Batch(#[from] BatchError),

    /// The batch was cancelled before every file was submitted
    #[error("sync cancelled")]
    Cancelled,

    /// A worker task panicked or was aborted
    #[error("worker failure: {0}")]
    Worker(String),
}

impl SyncError {
    /// The per-file results, when the batch ran to completion with failures
    pub fn batch_result(&self) -> Option<&vaultpush_core::domain::BatchResult> {
        match self {
            SyncError::Batch(err) => Some(err.result()),
            _ => None,
        }
    }
}
