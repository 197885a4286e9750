//! Shared test helpers for sync engine integration tests
//!
//! Provides an in-memory [`FakeObjectStore`] with failure injection and
//! instrumentation, a [`RecordingObserver`], and helpers for building
//! vault-shaped trees in a temporary directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use vaultpush_core::domain::{BatchResult, BucketName, JobReport, ObjectKey, RetryPolicy};
use vaultpush_core::ports::{
    IObjectStore, ISyncObserver, PutObjectRequest, RemoteObjectMetadata, StoreError, UploadInfo,
    FINGERPRINT_METADATA_KEY,
};
use vaultpush_sync::engine::EngineSettings;
use vaultpush_sync::fingerprint::fingerprint;
use vaultpush_sync::pool::PoolConfig;
use vaultpush_sync::source::LocalDirectoryProvider;
use vaultpush_sync::SyncEngine;

// ============================================================================
// FakeObjectStore
// ============================================================================

/// An object as the fake store holds it
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub content_language: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// In-memory object store with programmable failures
///
/// Objects are keyed by `"bucket/key"`.
#[derive(Default)]
pub struct FakeObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    put_calls: AtomicUsize,
    stat_calls: AtomicUsize,
    /// Remaining puts that fail with a transient error
    failing_puts: AtomicUsize,
    always_fail_puts: AtomicBool,
    reject_puts: AtomicBool,
    /// Remaining stats that fail with a transient error
    failing_stats: AtomicUsize,
    /// Next put stores the object but reports a transient failure
    lose_next_ack: AtomicBool,
    /// Puts delete their source file before reading it
    vanish_sources: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Mutex<Duration>,
}

#[allow(dead_code)]
impl FakeObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_puts(&self, n: usize) {
        self.failing_puts.store(n, Ordering::SeqCst);
    }

    pub fn fail_all_puts(&self) {
        self.always_fail_puts.store(true, Ordering::SeqCst);
    }

    pub fn reject_puts(&self) {
        self.reject_puts.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_stats(&self, n: usize) {
        self.failing_stats.store(n, Ordering::SeqCst);
    }

    pub fn lose_next_ack(&self) {
        self.lose_next_ack.store(true, Ordering::SeqCst);
    }

    pub fn vanish_sources_before_put(&self) {
        self.vanish_sources.store(true, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Seeds an object with the given body and fingerprint metadata
    pub fn insert(&self, bucket: &str, key: &str, body: &[u8], digest: &str) {
        let metadata = HashMap::from([(FINGERPRINT_METADATA_KEY.to_string(), digest.to_string())]);
        self.objects.lock().unwrap().insert(
            format!("{bucket}/{key}"),
            StoredObject {
                body: body.to_vec(),
                content_type: "application/octet-stream".to_string(),
                content_language: None,
                metadata,
            },
        );
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{key}"))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn stat_calls(&self) -> usize {
        self.stat_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Decrements the in-flight gauge on drop
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl IObjectStore for FakeObjectStore {
    async fn put_object(&self, request: PutObjectRequest) -> Result<UploadInfo, StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.reject_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("AccessDenied".to_string()));
        }
        if self.always_fail_puts.load(Ordering::SeqCst) || Self::take_one(&self.failing_puts) {
            return Err(StoreError::Transient("connection reset by peer".to_string()));
        }

        if self.vanish_sources.load(Ordering::SeqCst) {
            let _ = std::fs::remove_file(&request.source);
        }
        let body = tokio::fs::read(&request.source).await?;
        assert_eq!(body.len() as u64, request.size, "size must match streamed body");
        let size = request.size;
        self.objects.lock().unwrap().insert(
            format!("{}/{}", request.bucket, request.key),
            StoredObject {
                body,
                content_type: request.content_type,
                content_language: request.content_language,
                metadata: request.metadata,
            },
        );

        if self.lose_next_ack.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Transient("response lost".to_string()));
        }
        Ok(UploadInfo {
            etag: Some(format!("\"etag-{size}\"")),
            size,
        })
    }

    async fn stat_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> Result<RemoteObjectMetadata, StoreError> {
        self.stat_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_one(&self.failing_stats) {
            return Err(StoreError::Transient("timeout".to_string()));
        }
        let objects = self.objects.lock().unwrap();
        Ok(match objects.get(&format!("{bucket}/{key}")) {
            Some(object) => RemoteObjectMetadata {
                exists: true,
                digest: object.metadata.get(FINGERPRINT_METADATA_KEY).cloned(),
                etag: None,
                size: Some(object.body.len() as u64),
            },
            None => RemoteObjectMetadata::absent(),
        })
    }
}

// ============================================================================
// RecordingObserver
// ============================================================================

/// Observer that keeps every event for later assertions
#[derive(Default)]
pub struct RecordingObserver {
    pub jobs: Mutex<Vec<JobReport>>,
    pub batches: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

impl ISyncObserver for RecordingObserver {
    fn job_finished(&self, report: &JobReport) {
        self.jobs.lock().unwrap().push(report.clone());
    }

    fn batch_finished(&self, _result: &BatchResult) {
        self.batches.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Tree + engine helpers
// ============================================================================

/// Writes `content` to `root/rel`, creating parent directories
pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

/// Fingerprint of a file on disk, as a hex string
#[allow(dead_code)]
pub async fn digest_of(path: &Path) -> String {
    fingerprint(path).await.unwrap().to_string()
}

/// Settings with millisecond retry delays so failure tests run fast
pub fn fast_settings(num_workers: usize, max_attempts: u32) -> EngineSettings {
    EngineSettings {
        pool: PoolConfig::new(num_workers, 16),
        retry: RetryPolicy::fixed(max_attempts, Duration::from_millis(1)).unwrap(),
        ..EngineSettings::default()
    }
}

/// Builds an engine over `root` backed by `store`
pub fn engine(
    root: &TempDir,
    store: &Arc<FakeObjectStore>,
    observer: Arc<dyn ISyncObserver>,
    settings: EngineSettings,
) -> SyncEngine {
    SyncEngine::new(
        store.clone(),
        Arc::new(LocalDirectoryProvider::new(root.path())),
        observer,
        settings,
    )
}
