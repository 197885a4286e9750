//! PUT object uploads

use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use vaultpush_core::ports::{IObjectStore, StoreError};

use crate::common::{error_body, put_request, setup_s3_mock};

#[tokio::test]
async fn test_put_sends_attributes_and_returns_etag() {
    let (server, store) = setup_s3_mock().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("PUT"))
        .and(path("/posts/Post1/Post1.md"))
        .and(header("content-type", "application/octet-stream"))
        .and(header("content-language", "ru-RU"))
        .and(header("x-amz-meta-is-posted", "false"))
        .and(header("x-amz-meta-fingerprint", "f00d"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"etag-1\""))
        .expect(1)
        .mount(&server)
        .await;

    let info = store
        .put_object(put_request(dir.path(), "posts", "Post1/Post1.md", b"# Post 1\n"))
        .await
        .unwrap();

    assert_eq!(info.etag.as_deref(), Some("\"etag-1\""));
    assert_eq!(info.size, 9);
}

#[tokio::test]
async fn test_put_service_unavailable_is_retryable() {
    let (server, store) = setup_s3_mock().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("PUT"))
        .and(path("/posts/a.md"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_string(error_body("ServiceUnavailable", "Please try again.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = store
        .put_object(put_request(dir.path(), "posts", "a.md", b"x"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Transient(_)), "got {err:?}");
}

#[tokio::test]
async fn test_put_access_denied_is_rejected() {
    let (server, store) = setup_s3_mock().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("PUT"))
        .and(path("/posts/a.md"))
        .respond_with(
            ResponseTemplate::new(403).set_body_string(error_body("AccessDenied", "Access Denied.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = store
        .put_object(put_request(dir.path(), "posts", "a.md", b"x"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Rejected(_)), "got {err:?}");
    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn test_put_missing_source_is_io_error() {
    let (server, store) = setup_s3_mock().await;
    let dir = TempDir::new().unwrap();
    let mut request = put_request(dir.path(), "posts", "a.md", b"x");
    std::fs::remove_file(&request.source).unwrap();
    request.size = 1;

    let err = store.put_object(request).await.unwrap_err();

    assert!(matches!(err, StoreError::Io(_)), "got {err:?}");
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
