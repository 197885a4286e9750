//! S3 client construction
//!
//! Turns a [`StoreConfig`] into an `aws_sdk_s3::Client`. The SDK's own retry
//! layer is disabled: the sync engine owns retries so that attempt counts in
//! job reports match what actually went over the wire.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vaultpush_core::config::StoreConfig;
//! use vaultpush_s3::client::{build_client, S3Settings};
//!
//! # fn example() -> Result<(), vaultpush_s3::ClientError> {
//! let settings = S3Settings::from_config(&StoreConfig {
//!     access_key: "minio".into(),
//!     secret_key: "minio123".into(),
//!     ..StoreConfig::default()
//! })?;
//! let client = build_client(&settings);
//! # let _ = client;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client;
use thiserror::Error;

use vaultpush_core::config::StoreConfig;

/// Provider name attached to the static credentials
const CREDENTIALS_PROVIDER_NAME: &str = "vaultpush-config";

/// Errors building an S3 client from configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("store endpoint is empty")]
    EmptyEndpoint,

    #[error("store endpoint has unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("store access_key and secret_key must both be set")]
    MissingCredentials,
}

/// Resolved connection settings
#[derive(Clone)]
pub struct S3Settings {
    /// Endpoint URL including the scheme
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub force_path_style: bool,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("force_path_style", &self.force_path_style)
            .finish_non_exhaustive()
    }
}

impl S3Settings {
    /// Validates `config` and normalizes its endpoint
    pub fn from_config(config: &StoreConfig) -> Result<Self, ClientError> {
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(ClientError::MissingCredentials);
        }

        Ok(Self {
            endpoint: normalize_endpoint(&config.endpoint, config.secure)?,
            region: config.region.clone(),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
            force_path_style: config.force_path_style,
        })
    }
}

/// Prepends a scheme to bare `host:port` endpoints
///
/// `secure` picks `https://` over `http://`; endpoints that already carry
/// a scheme keep it. Trailing slashes are dropped.
pub fn normalize_endpoint(endpoint: &str, secure: bool) -> Result<String, ClientError> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::EmptyEndpoint);
    }

    match trimmed.split_once("://") {
        Some((scheme, _)) => {
            let scheme = scheme.to_ascii_lowercase();
            if scheme == "http" || scheme == "https" {
                Ok(trimmed.to_string())
            } else {
                Err(ClientError::UnsupportedScheme(scheme))
            }
        }
        None if secure => Ok(format!("https://{trimmed}")),
        None => Ok(format!("http://{trimmed}")),
    }
}

/// Builds an SDK client with static credentials and SDK retries off
pub fn build_client(settings: &S3Settings) -> Client {
    let credentials = Credentials::new(
        settings.access_key.clone(),
        settings.secret_key.clone(),
        None,
        None,
        CREDENTIALS_PROVIDER_NAME,
    );

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(settings.endpoint.clone())
        .force_path_style(settings.force_path_style)
        .retry_config(RetryConfig::disabled())
        .build();

    Client::from_conf(config)
}
