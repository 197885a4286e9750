//! Domain entities and business rules
//!
//! This module contains the core domain types for vaultpush:
//! - Newtypes for validated values (fingerprints, bucket names, object keys)
//! - Sync jobs and their identities
//! - Per-job outcomes and batch aggregation
//! - Retry policy
//! - Domain-specific error types

pub mod errors;
pub mod job;
pub mod newtypes;
pub mod outcome;
pub mod retry;

// Re-export commonly used types
pub use errors::DomainError;
pub use job::{JobId, SyncJob};
pub use newtypes::*;
pub use outcome::{BatchError, BatchResult, BatchSummary, JobError, JobReport, Outcome};
pub use retry::RetryPolicy;
