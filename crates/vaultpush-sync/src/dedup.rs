//! Dedup decision
//!
//! Compares a local fingerprint with what the store reports for the same
//! key. The digest compared against is whatever the object store adapter
//! surfaces in [`RemoteObjectMetadata::digest`].

use vaultpush_core::domain::Fingerprint;
use vaultpush_core::ports::RemoteObjectMetadata;

/// Returns `true` when the local content must be (re)uploaded
///
/// - no remote object: upload
/// - remote digest equals the local fingerprint: skip
/// - remote digest differs or is missing: upload, overwriting
#[must_use]
pub fn should_upload(local: &Fingerprint, remote: &RemoteObjectMetadata) -> bool {
    if !remote.exists {
        return true;
    }
    match remote.digest.as_deref() {
        Some(digest) => !local.matches(digest),
        None => true,
    }
}
