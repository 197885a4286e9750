//! vaultpush S3 - object store adapter for S3-compatible services
//!
//! Implements the [`IObjectStore`](vaultpush_core::ports::IObjectStore) port
//! on top of `aws-sdk-s3`, targeting MinIO with path-style addressing.
//!
//! ## Modules
//!
//! - [`client`] - SDK client construction from [`StoreConfig`](vaultpush_core::config::StoreConfig)
//! - [`error`] - Mapping SDK failures onto transient/rejected store errors
//! - [`store`] - The [`S3ObjectStore`] adapter

pub mod client;
pub mod error;
pub mod store;

pub use client::{ClientError, S3Settings};
pub use store::S3ObjectStore;
