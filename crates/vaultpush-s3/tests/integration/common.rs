//! Shared helpers for S3 adapter integration tests
//!
//! Starts a wiremock server and points an [`S3ObjectStore`] at it with
//! path-style addressing, so requests arrive as `/{bucket}/{key}`.

use std::collections::HashMap;
use std::path::Path;

use wiremock::MockServer;

use vaultpush_core::config::StoreConfig;
use vaultpush_core::domain::{BucketName, ObjectKey};
use vaultpush_core::ports::PutObjectRequest;
use vaultpush_s3::S3ObjectStore;

/// Starts a mock server and returns a store pointed at it
pub async fn setup_s3_mock() -> (MockServer, S3ObjectStore) {
    let server = MockServer::start().await;
    let store = S3ObjectStore::from_config(&StoreConfig {
        endpoint: server.uri(),
        access_key: "test-access-key".to_string(),
        secret_key: "test-secret-key".to_string(),
        ..StoreConfig::default()
    })
    .expect("store config is valid");
    (server, store)
}

pub fn bucket(name: &str) -> BucketName {
    BucketName::new(name).unwrap()
}

pub fn key(name: &str) -> ObjectKey {
    ObjectKey::new(name).unwrap()
}

/// Writes `body` to `dir/name` and returns a put request for it
pub fn put_request(dir: &Path, bucket_name: &str, key_name: &str, body: &[u8]) -> PutObjectRequest {
    let source = dir.join(key_name.replace('/', "_"));
    std::fs::write(&source, body).unwrap();
    PutObjectRequest {
        bucket: bucket(bucket_name),
        key: key(key_name),
        source,
        size: body.len() as u64,
        content_type: "application/octet-stream".to_string(),
        content_language: Some("ru-RU".to_string()),
        metadata: HashMap::from([
            ("is-posted".to_string(), "false".to_string()),
            ("fingerprint".to_string(), "f00d".to_string()),
        ]),
    }
}

/// S3-style XML error body
pub fn error_body(code: &str, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Error><Code>{code}</Code><Message>{message}</Message><RequestId>req-1</RequestId></Error>"
    )
}
