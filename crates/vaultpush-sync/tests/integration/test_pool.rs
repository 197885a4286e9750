//! Worker pool bounds and backpressure

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use vaultpush_core::domain::{BucketName, ObjectKey, RetryPolicy, SyncJob};
use vaultpush_core::ports::NoopObserver;
use vaultpush_sync::pool::{run_batch, JobSource, PoolConfig};
use vaultpush_sync::retry::{UploadSettings, Uploader};
use vaultpush_sync::{SyncError, WalkError};

use crate::common::{self, FakeObjectStore, RecordingObserver};

fn jobs(root: &TempDir, count: usize) -> VecDeque<SyncJob> {
    (0..count)
        .map(|i| {
            let key = format!("note-{i}.md");
            let path = common::write_file(root.path(), &key, &key);
            SyncJob::new(
                BucketName::new("posts").unwrap(),
                ObjectKey::new(key).unwrap(),
                path,
            )
            .unwrap()
        })
        .collect()
}

fn uploader(store: &Arc<FakeObjectStore>) -> Arc<Uploader> {
    Arc::new(Uploader::new(
        store.clone(),
        RetryPolicy::fixed(3, Duration::from_millis(1)).unwrap(),
        UploadSettings::default(),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_never_exceeds_pool_size() {
    for workers in [1usize, 3] {
        let root = TempDir::new().unwrap();
        let store = FakeObjectStore::new();
        store.set_latency(Duration::from_millis(10));

        let reports = run_batch(
            jobs(&root, 24),
            uploader(&store),
            Arc::new(NoopObserver),
            PoolConfig::new(workers, 4),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(reports.len(), 24);
        assert_eq!(store.put_calls(), 24);
        assert!(
            store.max_in_flight() <= workers,
            "max in flight {} > {workers}",
            store.max_in_flight()
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_workers_run_concurrently() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    store.set_latency(Duration::from_millis(30));

    run_batch(
        jobs(&root, 16),
        uploader(&store),
        Arc::new(NoopObserver),
        PoolConfig::new(4, 16),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(store.max_in_flight() > 1);
}

#[tokio::test]
async fn test_small_buffer_drops_nothing() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    store.set_latency(Duration::from_millis(2));
    let observer = RecordingObserver::new();

    let reports = run_batch(
        jobs(&root, 30),
        uploader(&store),
        observer.clone(),
        PoolConfig::new(2, 1),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(reports.len(), 30);
    assert_eq!(observer.job_count(), 30);
    assert_eq!(store.object_count(), 30);
}

#[tokio::test]
async fn test_empty_source_returns_no_reports() {
    let store = FakeObjectStore::new();
    let reports = run_batch(
        VecDeque::<SyncJob>::new(),
        uploader(&store),
        Arc::new(NoopObserver),
        PoolConfig::new(4, 4),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert!(reports.is_empty());
}

#[tokio::test]
async fn test_failed_jobs_still_reported() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    store.reject_puts();

    let reports = run_batch(
        jobs(&root, 5),
        uploader(&store),
        Arc::new(NoopObserver),
        PoolConfig::new(2, 2),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(reports.len(), 5);
    assert!(reports.iter().all(|r| r.outcome.is_failed()));
}

/// Yields its jobs, then fails the way an unreadable directory does
struct BrokenWalk {
    jobs: VecDeque<SyncJob>,
}

#[async_trait::async_trait]
impl JobSource for BrokenWalk {
    async fn next_job(&mut self) -> Result<Option<SyncJob>, SyncError> {
        match self.jobs.pop_front() {
            Some(job) => Ok(Some(job)),
            None => Err(SyncError::Enumeration(WalkError::Io {
                path: "/vault/06 - Articles".into(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })),
        }
    }
}

#[tokio::test]
async fn test_enumeration_error_abandons_queued_jobs() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    store.set_latency(Duration::from_millis(20));
    let observer = RecordingObserver::new();

    let result = run_batch(
        BrokenWalk {
            jobs: jobs(&root, 20),
        },
        uploader(&store),
        observer.clone(),
        PoolConfig::new(1, 1000),
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(
        result,
        Err(SyncError::Enumeration(WalkError::Io { .. }))
    ));
    // Only the upload already in flight may complete
    assert!(store.put_calls() <= 2, "put calls: {}", store.put_calls());
    assert!(observer.job_count() <= 2);
}

/// Fires `cancel` when asked for the job after the first `keep`
struct CancelAfter {
    jobs: VecDeque<SyncJob>,
    keep: usize,
    cancel: CancellationToken,
}

#[async_trait::async_trait]
impl JobSource for CancelAfter {
    async fn next_job(&mut self) -> Result<Option<SyncJob>, SyncError> {
        if self.keep == 0 {
            self.cancel.cancel();
        } else {
            self.keep -= 1;
        }
        Ok(self.jobs.pop_front())
    }
}

#[tokio::test]
async fn test_cancellation_drains_queued_jobs() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    store.set_latency(Duration::from_millis(5));
    let observer = RecordingObserver::new();
    let cancel = CancellationToken::new();

    let result = run_batch(
        CancelAfter {
            jobs: jobs(&root, 20),
            keep: 6,
            cancel: cancel.clone(),
        },
        uploader(&store),
        observer.clone(),
        PoolConfig::new(1, 16),
        cancel,
    )
    .await;

    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert_eq!(store.put_calls(), 6);
    assert_eq!(observer.job_count(), 6);
}
