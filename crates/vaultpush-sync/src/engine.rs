//! Push synchronization engine
//!
//! The [`SyncEngine`] pushes a local tree into an S3-compatible store,
//! skipping files whose content the store already holds.
//!
//! ## Sync Flow
//!
//! 1. **Materialize**: ask the source provider for the root directory
//! 2. **Route**: map each top-level directory to a bucket; others are ignored
//! 3. **Walk + dispatch**: stream every file below the routed directories
//!    into the bounded worker pool
//! 4. **Upload**: each worker fingerprints, checks the remote digest and
//!    uploads with retry
//! 5. **Aggregate**: collect one outcome per file; any failure turns the
//!    batch into an error naming every failed file
//!
//! The engine has no timing logic of its own; callers trigger
//! [`SyncEngine::run_sync`] on their own schedule.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use vaultpush_core::config::Config;
use vaultpush_core::domain::{BatchResult, BucketName, JobId, ObjectKey, RetryPolicy, SyncJob};
use vaultpush_core::ports::{IObjectStore, ISourceTreeProvider, ISyncObserver};

use crate::pool::{run_batch, JobSource, PoolConfig};
use crate::retry::{UploadSettings, Uploader};
use crate::router::BucketRouter;
use crate::walker::{PathPolicy, TreeWalker, WalkError};
use crate::SyncError;

// ============================================================================
// EngineSettings
// ============================================================================

/// Immutable settings for one engine instance
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub pool: PoolConfig,
    pub retry: RetryPolicy,
    pub router: BucketRouter,
    pub path_policy: PathPolicy,
    pub upload: UploadSettings,
}

impl EngineSettings {
    /// Derives engine settings from the application configuration
    ///
    /// # Errors
    /// Returns `SyncError::InvalidSettings` if the retry section is invalid
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        Ok(Self {
            pool: PoolConfig::from_config(&config.workers),
            retry: config.retry_policy()?,
            router: BucketRouter::from_config(&config.routing),
            path_policy: PathPolicy::from_config(&config.routing),
            upload: UploadSettings::from_config(&config.upload),
        })
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            retry: RetryPolicy::default(),
            router: BucketRouter::default(),
            path_policy: PathPolicy::new().skip_hidden(true),
            upload: UploadSettings::default(),
        }
    }
}

// ============================================================================
// Subtree discovery
// ============================================================================

/// A top-level directory and the bucket it syncs into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtree {
    pub bucket: BucketName,
    pub root: PathBuf,
}

/// Lists the top-level directories of `root` that the router accepts
///
/// Result is sorted by directory path so runs are reproducible.
pub async fn discover_subtrees(
    root: &Path,
    router: &BucketRouter,
    policy: &PathPolicy,
) -> Result<Vec<Subtree>, SyncError> {
    let io_err = |source| {
        SyncError::Enumeration(WalkError::Io {
            path: root.to_path_buf(),
            source,
        })
    };

    let mut entries = tokio::fs::read_dir(root).await.map_err(io_err)?;
    let mut subtrees = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if policy.classify(&name) == crate::walker::SegmentAction::Skip {
            continue;
        }
        if !entry.file_type().await.map_err(io_err)?.is_dir() {
            continue;
        }
        match router.resolve(&name) {
            Some(bucket) => {
                debug!(dir = %name, bucket = %bucket, "Routing directory");
                subtrees.push(Subtree {
                    bucket,
                    root: entry.path(),
                });
            }
            None => debug!(dir = %name, "Directory not routed, ignoring"),
        }
    }

    subtrees.sort_by(|a, b| a.root.cmp(&b.root));
    Ok(subtrees)
}

// ============================================================================
// TreeJobs: job source over routed subtrees
// ============================================================================

/// Streams one [`SyncJob`] per file under each subtree
///
/// Rejects two files that map to the same bucket and key, which can happen
/// through flattening or two directories routing to one bucket.
pub struct TreeJobs {
    pending: std::vec::IntoIter<Subtree>,
    current: Option<(BucketName, TreeWalker)>,
    policy: PathPolicy,
    seen: HashMap<JobId, PathBuf>,
}

impl TreeJobs {
    #[must_use]
    pub fn new(subtrees: Vec<Subtree>, policy: PathPolicy) -> Self {
        Self {
            pending: subtrees.into_iter(),
            current: None,
            policy,
            seen: HashMap::new(),
        }
    }

    fn make_job(&mut self, bucket: &BucketName, absolute: PathBuf, relative: &Path) -> Result<SyncJob, WalkError> {
        let key = ObjectKey::from_relative_path(relative).map_err(|source| WalkError::InvalidKey {
            path: absolute.clone(),
            source,
        })?;
        let id = JobId::new(bucket.clone(), key.clone());
        if let Some(first) = self.seen.get(&id) {
            return Err(WalkError::DuplicateKey {
                job: id,
                first: first.clone(),
                second: absolute,
            });
        }
        self.seen.insert(id, absolute.clone());
        SyncJob::new(bucket.clone(), key, absolute.clone()).map_err(|source| WalkError::InvalidKey {
            path: absolute,
            source,
        })
    }
}

#[async_trait::async_trait]
impl JobSource for TreeJobs {
    async fn next_job(&mut self) -> Result<Option<SyncJob>, SyncError> {
        loop {
            if self.current.is_none() {
                let Some(subtree) = self.pending.next() else {
                    return Ok(None);
                };
                debug!(bucket = %subtree.bucket, root = %subtree.root.display(), "Walking subtree");
                let walker = TreeWalker::new(subtree.root, self.policy.clone());
                self.current = Some((subtree.bucket, walker));
            }

            let Some((bucket, walker)) = self.current.as_mut() else {
                continue;
            };
            match walker.next_entry().await? {
                Some(entry) => {
                    let bucket = bucket.clone();
                    let job = self.make_job(&bucket, entry.absolute, &entry.relative)?;
                    return Ok(Some(job));
                }
                None => self.current = None,
            }
        }
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Push synchronization engine
///
/// ## Dependencies
///
/// - `store`: object store the tree is pushed into (IObjectStore)
/// - `source`: provides the local root (ISourceTreeProvider)
/// - `observer`: receives per-job and per-batch outcomes (ISyncObserver)
///
/// The engine holds no state between runs other than its immutable
/// settings, so one instance can be reused for every scheduled cycle.
pub struct SyncEngine {
    source: Arc<dyn ISourceTreeProvider>,
    observer: Arc<dyn ISyncObserver>,
    uploader: Arc<Uploader>,
    settings: EngineSettings,
}

impl SyncEngine {
    /// Creates a new `SyncEngine` with the given collaborators
    pub fn new(
        store: Arc<dyn IObjectStore>,
        source: Arc<dyn ISourceTreeProvider>,
        observer: Arc<dyn ISyncObserver>,
        settings: EngineSettings,
    ) -> Self {
        let uploader = Arc::new(Uploader::new(
            store,
            settings.retry,
            settings.upload.clone(),
        ));
        Self {
            source,
            observer,
            uploader,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Runs one complete batch
    ///
    /// Returns the batch result when every file was uploaded or skipped.
    ///
    /// # Errors
    /// - `SyncError::SourceUnavailable` if the root cannot be materialized
    /// - `SyncError::Enumeration` if walking the tree fails
    /// - `SyncError::Batch` if one or more files failed; the error names each
    pub async fn run_sync(&self) -> Result<BatchResult, SyncError> {
        self.run_sync_with_cancel(CancellationToken::new()).await
    }

    /// Like [`run_sync`](Self::run_sync), but stops submitting new files
    /// once `cancel` fires
    ///
    /// Files already queued or in flight run to completion, then
    /// `SyncError::Cancelled` is returned.
    #[tracing::instrument(skip_all, fields(source = %self.source.describe()))]
    pub async fn run_sync_with_cancel(
        &self,
        cancel: CancellationToken,
    ) -> Result<BatchResult, SyncError> {
        let started_at = Utc::now();
        info!("Starting sync batch");

        let root = self.source.materialize().await.map_err(|err| {
            error!(error = %format!("{err:#}"), "Source tree unavailable");
            SyncError::SourceUnavailable(format!("{err:#}"))
        })?;

        let subtrees =
            discover_subtrees(&root, &self.settings.router, &self.settings.path_policy).await?;
        if subtrees.is_empty() {
            warn!(root = %root.display(), "No recognized directories under root, nothing to sync");
            let result = BatchResult::empty(started_at);
            self.observer.batch_finished(&result);
            return Ok(result);
        }
        info!(
            subtrees = subtrees.len(),
            buckets = %subtrees
                .iter()
                .map(|s| s.bucket.as_str())
                .collect::<Vec<_>>()
                .join(","),
            "Resolved buckets"
        );

        let jobs = TreeJobs::new(subtrees, self.settings.path_policy.clone());
        let reports = run_batch(
            jobs,
            Arc::clone(&self.uploader),
            Arc::clone(&self.observer),
            self.settings.pool,
            cancel,
        )
        .await
        .map_err(|err| {
            error!(error = %err, "Sync batch aborted");
            err
        })?;

        let result = BatchResult::new(reports, started_at);
        self.observer.batch_finished(&result);
        result.into_result().map_err(SyncError::Batch)
    }
}
