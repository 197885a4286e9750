//! Upload-with-retry
//!
//! The [`Uploader`] runs one job through a bounded attempt loop:
//!
//! ```text
//! fingerprint ──→ attempt n ──→ stat ──(current)──→ Skipped
//!                    ▲           │
//!                    │         (stale/absent)
//!                    │           ▼
//!              wait delay ◄── put ──(ok)──→ Uploaded
//!                              │
//!                        (exhausted / rejected) ──→ Failed
//! ```
//!
//! Remote state is re-checked on every attempt, so a put whose response
//! was lost but which landed remotely turns into `Skipped` on retry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use vaultpush_core::config::UploadConfig;
use vaultpush_core::domain::{JobError, JobReport, Outcome, RetryPolicy, SyncJob};
use vaultpush_core::ports::{
    IObjectStore, PutObjectRequest, StoreError, FINGERPRINT_METADATA_KEY,
};

use crate::dedup::should_upload;
use crate::fingerprint::digest_file;

/// Object attributes applied to every put
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub content_type: String,
    pub content_language: Option<String>,
    /// Defaults merged under each job's own metadata
    pub metadata: HashMap<String, String>,
}

impl UploadSettings {
    #[must_use]
    pub fn from_config(upload: &UploadConfig) -> Self {
        let language = upload.content_language.trim();
        Self {
            content_type: upload.content_type.clone(),
            content_language: (!language.is_empty()).then(|| language.to_string()),
            metadata: upload.metadata.clone(),
        }
    }

    /// Metadata for one put: defaults, then job overrides, then the fingerprint.
    ///
    /// Built per job; nothing is shared between workers.
    fn metadata_for(&self, job: &SyncJob, fingerprint: &str) -> HashMap<String, String> {
        let mut metadata = self.metadata.clone();
        if let Some(overrides) = job.metadata() {
            metadata.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        metadata.insert(FINGERPRINT_METADATA_KEY.to_string(), fingerprint.to_string());
        metadata
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

/// Uploads single jobs against an object store under a retry policy
#[derive(Clone)]
pub struct Uploader {
    store: Arc<dyn IObjectStore>,
    policy: RetryPolicy,
    settings: UploadSettings,
}

impl Uploader {
    pub fn new(store: Arc<dyn IObjectStore>, policy: RetryPolicy, settings: UploadSettings) -> Self {
        Self {
            store,
            policy,
            settings,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `job` to a final outcome
    ///
    /// Never returns an error: every failure is recorded in the report.
    #[tracing::instrument(skip(self, job), fields(job = %job.id()))]
    pub async fn upload_with_retry(&self, job: &SyncJob) -> JobReport {
        let report = |outcome, attempts| JobReport {
            job: job.id().clone(),
            outcome,
            attempts,
        };

        // Unreadable files fail the job without touching the store
        let digest = match digest_file(job.local_path()).await {
            Ok(digest) => digest,
            Err(err) => {
                warn!(error = %err, "Cannot fingerprint file");
                let failure = JobError::Fingerprint {
                    path: job.local_path().to_path_buf(),
                    message: err.to_string(),
                };
                return report(Outcome::Failed(failure), 0);
            }
        };

        let request = PutObjectRequest {
            bucket: job.bucket().clone(),
            key: job.key().clone(),
            source: job.local_path().to_path_buf(),
            size: digest.size,
            content_type: self.settings.content_type.clone(),
            content_language: self.settings.content_language.clone(),
            metadata: self
                .settings
                .metadata_for(job, digest.fingerprint.as_str()),
        };

        let max_attempts = self.policy.max_attempts();
        let mut last_error: Option<StoreError> = None;

        for attempt in 1..=max_attempts {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Waiting before retry");
                tokio::time::sleep(delay).await;
            }

            let remote = match self.store.stat_object(job.bucket(), job.key()).await {
                Ok(remote) => remote,
                Err(err) => {
                    if let Some(outcome) = self.classify_failure(job, err, attempt, &mut last_error) {
                        return report(outcome, attempt);
                    }
                    continue;
                }
            };

            if !should_upload(&digest.fingerprint, &remote) {
                info!(attempt, "Remote object is current, skipping");
                return report(Outcome::Skipped, attempt);
            }

            match self.store.put_object(request.clone()).await {
                Ok(upload) => {
                    info!(
                        attempt,
                        size = digest.size,
                        etag = upload.etag.as_deref().unwrap_or(""),
                        "Uploaded object"
                    );
                    return report(Outcome::Uploaded, attempt);
                }
                Err(err) => {
                    if let Some(outcome) = self.classify_failure(job, err, attempt, &mut last_error) {
                        return report(outcome, attempt);
                    }
                }
            }
        }

        let cause = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt was made".to_string());
        warn!(attempts = max_attempts, %cause, "Retries exhausted");
        report(
            Outcome::Failed(JobError::RetriesExhausted {
                attempts: max_attempts,
                cause,
            }),
            max_attempts,
        )
    }

    /// Records a store failure; returns a final outcome if it must not be retried
    fn classify_failure(
        &self,
        job: &SyncJob,
        err: StoreError,
        attempt: u32,
        last_error: &mut Option<StoreError>,
    ) -> Option<Outcome> {
        if let StoreError::Io(message) = err {
            warn!(attempt, error = %message, "Local file unreadable during upload");
            return Some(Outcome::Failed(JobError::LocalRead {
                path: job.local_path().to_path_buf(),
                message,
            }));
        }
        if !err.is_retryable() {
            warn!(attempt, error = %err, "Store rejected request");
            return Some(Outcome::Failed(JobError::Rejected {
                attempts: attempt,
                cause: err.to_string(),
            }));
        }
        warn!(
            attempt,
            max_attempts = self.policy.max_attempts(),
            error = %err,
            "Transient store error"
        );
        *last_error = Some(err);
        None
    }
}
