//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures of newtypes and retry policies.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid fingerprint format (expected lowercase hex SHA-256)
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Bucket name violates S3 naming rules
    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    /// Object key is empty, absolute, or escapes its subtree
    #[error("Invalid object key: {0}")]
    InvalidObjectKey(String),

    /// Retry policy parameters are out of range
    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
