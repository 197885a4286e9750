//! Sync job types
//!
//! A [`SyncJob`] is created when the tree walker yields a file and is
//! consumed exactly once by an upload worker. Jobs are immutable after
//! construction.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{BucketName, ObjectKey};

/// Identity of a job within a batch: the target bucket plus the object key
///
/// Keys are unique within a bucket; the pair is unique within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId {
    pub bucket: BucketName,
    pub key: ObjectKey,
}

impl JobId {
    #[must_use]
    pub fn new(bucket: BucketName, key: ObjectKey) -> Self {
        Self { bucket, key }
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// A single file to push into the object store
#[derive(Debug, Clone)]
pub struct SyncJob {
    id: JobId,
    local_path: PathBuf,
    metadata: Option<HashMap<String, String>>,
}

impl SyncJob {
    /// Creates a job for the file at `local_path`
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` if `local_path` is not absolute
    pub fn new(bucket: BucketName, key: ObjectKey, local_path: PathBuf) -> Result<Self, DomainError> {
        if !local_path.is_absolute() {
            return Err(DomainError::ValidationFailed(format!(
                "job path must be absolute: {}",
                local_path.display()
            )));
        }
        Ok(Self {
            id: JobId::new(bucket, key),
            local_path,
            metadata: None,
        })
    }

    /// Attaches per-job user metadata that overrides the configured defaults
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn id(&self) -> &JobId {
        &self.id
    }

    #[must_use]
    pub fn bucket(&self) -> &BucketName {
        &self.id.bucket
    }

    /// The object key, which is also the file's path relative to its subtree
    #[must_use]
    pub fn key(&self) -> &ObjectKey {
        &self.id.key
    }

    #[must_use]
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&HashMap<String, String>> {
        self.metadata.as_ref()
    }
}
