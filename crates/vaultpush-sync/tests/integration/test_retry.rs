//! Upload-with-retry behavior against a failing store

use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use vaultpush_core::domain::{BucketName, JobError, ObjectKey, Outcome, RetryPolicy, SyncJob};
use vaultpush_sync::retry::{UploadSettings, Uploader};

use crate::common::{self, FakeObjectStore};

fn job(root: &TempDir, key: &str, content: &str) -> SyncJob {
    let path = common::write_file(root.path(), key, content);
    SyncJob::new(
        BucketName::new("posts").unwrap(),
        ObjectKey::new(key).unwrap(),
        path,
    )
    .unwrap()
}

fn uploader(store: &Arc<FakeObjectStore>, attempts: u32, delay: Duration) -> Uploader {
    Uploader::new(
        store.clone(),
        RetryPolicy::fixed(attempts, delay).unwrap(),
        UploadSettings::default(),
    )
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    for k in 0..3u32 {
        let root = TempDir::new().unwrap();
        let store = FakeObjectStore::new();
        store.fail_next_puts(k as usize);

        let report = uploader(&store, 3, Duration::from_millis(1))
            .upload_with_retry(&job(&root, "a.md", "x"))
            .await;

        assert_eq!(report.outcome, Outcome::Uploaded, "k = {k}");
        assert_eq!(report.attempts, k + 1);
        assert_eq!(store.put_calls(), k as usize + 1);
    }
}

#[tokio::test]
async fn test_exhausted_after_max_attempts() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    store.fail_all_puts();

    let report = uploader(&store, 3, Duration::from_millis(1))
        .upload_with_retry(&job(&root, "a.md", "x"))
        .await;

    assert_eq!(report.attempts, 3);
    assert_eq!(store.put_calls(), 3);
    match report.outcome {
        Outcome::Failed(JobError::RetriesExhausted { attempts, cause }) => {
            assert_eq!(attempts, 3);
            assert!(cause.contains("connection reset"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_rejected_put_is_not_retried() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    store.reject_puts();

    let report = uploader(&store, 5, Duration::from_millis(1))
        .upload_with_retry(&job(&root, "a.md", "x"))
        .await;

    assert_eq!(store.put_calls(), 1);
    assert!(matches!(
        report.outcome,
        Outcome::Failed(JobError::Rejected { attempts: 1, .. })
    ));
}

#[tokio::test]
async fn test_unreadable_file_fails_without_store_calls() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    let missing = SyncJob::new(
        BucketName::new("posts").unwrap(),
        ObjectKey::new("gone.md").unwrap(),
        root.path().join("gone.md"),
    )
    .unwrap();

    let report = uploader(&store, 3, Duration::from_millis(1))
        .upload_with_retry(&missing)
        .await;

    assert_eq!(report.attempts, 0);
    assert!(matches!(report.outcome, Outcome::Failed(JobError::Fingerprint { .. })));
    assert_eq!(store.stat_calls(), 0);
    assert_eq!(store.put_calls(), 0);
}

#[tokio::test]
async fn test_file_removed_after_fingerprint_is_not_retried() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    store.vanish_sources_before_put();

    let report = uploader(&store, 3, Duration::from_millis(1))
        .upload_with_retry(&job(&root, "a.md", "x"))
        .await;

    assert_eq!(report.attempts, 1);
    assert_eq!(store.put_calls(), 1);
    match report.outcome {
        Outcome::Failed(JobError::LocalRead { path, .. }) => {
            assert_eq!(path, root.path().join("a.md"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_lost_ack_becomes_skip_on_retry() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    store.lose_next_ack();

    let report = uploader(&store, 3, Duration::from_millis(1))
        .upload_with_retry(&job(&root, "a.md", "x"))
        .await;

    // The first put landed; the re-check on attempt 2 sees it
    assert_eq!(report.outcome, Outcome::Skipped);
    assert_eq!(report.attempts, 2);
    assert_eq!(store.put_calls(), 1);
}

#[tokio::test]
async fn test_transient_stat_failure_is_retried() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    store.fail_next_stats(1);

    let report = uploader(&store, 3, Duration::from_millis(1))
        .upload_with_retry(&job(&root, "a.md", "x"))
        .await;

    assert_eq!(report.outcome, Outcome::Uploaded);
    assert_eq!(report.attempts, 2);
    assert_eq!(store.stat_calls(), 2);
    assert_eq!(store.put_calls(), 1);
}

#[tokio::test]
async fn test_waits_between_attempts() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    store.fail_all_puts();

    let started = Instant::now();
    uploader(&store, 3, Duration::from_millis(25))
        .upload_with_retry(&job(&root, "a.md", "x"))
        .await;

    // two waits: before attempt 2 and before attempt 3
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn test_single_attempt_policy() {
    let root = TempDir::new().unwrap();
    let store = FakeObjectStore::new();
    store.fail_next_puts(1);

    let report = uploader(&store, 1, Duration::from_secs(60))
        .upload_with_retry(&job(&root, "a.md", "x"))
        .await;

    assert!(report.outcome.is_failed());
    assert_eq!(store.put_calls(), 1);
}
