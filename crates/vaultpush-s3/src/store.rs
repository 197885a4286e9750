//! S3ObjectStore - IObjectStore implementation over aws-sdk-s3
//!
//! ## Design Notes
//!
//! - `stat_object` is a HEAD request; a 404 maps to
//!   [`RemoteObjectMetadata::absent`], anything else goes through
//!   [`classify_sdk_error`].
//! - The fingerprint is read back from user metadata
//!   (`x-amz-meta-fingerprint`). The ETag is reported but never used as a
//!   digest, since multipart ETags are not content hashes.
//! - Bodies are streamed from disk with `ByteStream::from_path`, so memory
//!   use does not grow with file size.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, instrument};

use vaultpush_core::config::StoreConfig;
use vaultpush_core::domain::{BucketName, ObjectKey};
use vaultpush_core::ports::{
    IObjectStore, PutObjectRequest, RemoteObjectMetadata, StoreError, UploadInfo,
    FINGERPRINT_METADATA_KEY,
};

use crate::client::{build_client, ClientError, S3Settings};
use crate::error::{classify_sdk_error, is_not_found};

/// Object store backed by an S3-compatible service
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    endpoint: String,
}

impl S3ObjectStore {
    /// Builds a store from resolved settings
    pub fn new(settings: &S3Settings) -> Self {
        Self {
            client: build_client(settings),
            endpoint: settings.endpoint.clone(),
        }
    }

    /// Builds a store from the `store` config section
    pub fn from_config(config: &StoreConfig) -> Result<Self, ClientError> {
        Ok(Self::new(&S3Settings::from_config(config)?))
    }

    /// Endpoint URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Extracts the recorded fingerprint from user metadata
fn digest_from_metadata(metadata: Option<&HashMap<String, String>>) -> Option<String> {
    metadata?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(FINGERPRINT_METADATA_KEY))
        .map(|(_, value)| value.clone())
}

#[async_trait]
impl IObjectStore for S3ObjectStore {
    #[instrument(skip(self, request), fields(backend = "s3", bucket = %request.bucket, key = %request.key, size = request.size))]
    async fn put_object(&self, request: PutObjectRequest) -> Result<UploadInfo, StoreError> {
        let body = ByteStream::from_path(&request.source)
            .await
            .map_err(|e| StoreError::Io(format!("{}: {e}", request.source.display())))?;

        let output = self
            .client
            .put_object()
            .bucket(request.bucket.as_str())
            .key(request.key.as_str())
            .body(body)
            .content_type(request.content_type)
            .set_content_language(request.content_language)
            .set_metadata(Some(request.metadata))
            .send()
            .await
            .map_err(classify_sdk_error)?;

        debug!(etag = ?output.e_tag(), "Object stored");
        Ok(UploadInfo {
            etag: output.e_tag().map(str::to_string),
            size: request.size,
        })
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn stat_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> Result<RemoteObjectMetadata, StoreError> {
        let output = match self
            .client
            .head_object()
            .bucket(bucket.as_str())
            .key(key.as_str())
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if is_not_found(&err) => return Ok(RemoteObjectMetadata::absent()),
            Err(err) => return Err(classify_sdk_error(err)),
        };

        Ok(RemoteObjectMetadata {
            exists: true,
            digest: digest_from_metadata(output.metadata()),
            etag: output.e_tag().map(str::to_string),
            size: output.content_length().and_then(|len| u64::try_from(len).ok()),
        })
    }
}
