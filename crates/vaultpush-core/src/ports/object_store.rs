//! Object store port (driven/secondary port)
//!
//! This module defines the two operations the sync engine needs from an
//! S3-compatible store: a metadata probe and a streaming put.
//!
//! ## Design Notes
//!
//! - A missing object is not an error: `stat_object` returns
//!   [`RemoteObjectMetadata::absent`].
//! - Errors are classified into transient and rejected so the retry loop
//!   can stop early on failures that will never succeed.
//! - The content fingerprint travels as user metadata under
//!   [`FINGERPRINT_METADATA_KEY`] and is surfaced back as `digest`.

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::newtypes::{BucketName, ObjectKey};

/// User-metadata key under which the content fingerprint is stored
pub const FINGERPRINT_METADATA_KEY: &str = "fingerprint";

// ============================================================================
// Errors
// ============================================================================

/// Failure reported by an object store adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Network failure, timeout, throttling or server-side error
    #[error("transient store error: {0}")]
    Transient(String),

    /// The store refused the request (auth, missing bucket, bad request)
    #[error("store rejected request: {0}")]
    Rejected(String),

    /// Reading the local source for an upload failed; never retried
    #[error("local I/O error: {0}")]
    Io(String),
}

impl StoreError {
    /// Whether another attempt may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Transient(_) => true,
            StoreError::Rejected(_) | StoreError::Io(_) => false,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

// ============================================================================
// DTOs
// ============================================================================

/// What the store knows about an object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteObjectMetadata {
    pub exists: bool,
    /// Fingerprint recorded at upload time, if the object carries one
    pub digest: Option<String>,
    pub etag: Option<String>,
    pub size: Option<u64>,
}

impl RemoteObjectMetadata {
    /// Metadata for an object that does not exist
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Metadata for an existing object carrying `digest`
    #[must_use]
    pub fn with_digest(digest: impl Into<String>) -> Self {
        Self {
            exists: true,
            digest: Some(digest.into()),
            ..Self::default()
        }
    }
}

/// A single upload request
///
/// The body is streamed from `source`; `size` is the length observed when
/// the job was fingerprinted.
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub bucket: BucketName,
    pub key: ObjectKey,
    pub source: PathBuf,
    pub size: u64,
    pub content_type: String,
    pub content_language: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Store acknowledgement of a completed put
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadInfo {
    pub etag: Option<String>,
    pub size: u64,
}

// ============================================================================
// IObjectStore trait
// ============================================================================

/// Port trait for S3-compatible object storage
///
/// Implementations must be safe to call concurrently from many workers.
#[async_trait::async_trait]
pub trait IObjectStore: Send + Sync {
    /// Streams the request's source file into `bucket/key`, replacing any
    /// existing object
    async fn put_object(&self, request: PutObjectRequest) -> Result<UploadInfo, StoreError>;

    /// Returns the object's metadata, or [`RemoteObjectMetadata::absent`]
    /// if there is no object at `bucket/key`
    async fn stat_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> Result<RemoteObjectMetadata, StoreError>;
}
