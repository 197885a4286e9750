//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the sync engine
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IObjectStore`] - Object storage operations (S3, MinIO, test doubles)
//! - [`ISourceTreeProvider`] - Produces the local tree to push (directory, git checkout)
//! - [`ISyncObserver`] - Receives per-job and per-batch outcomes

pub mod object_store;
pub mod observer;
pub mod source_tree;

pub use object_store::{
    IObjectStore, PutObjectRequest, RemoteObjectMetadata, StoreError, UploadInfo,
    FINGERPRINT_METADATA_KEY,
};
pub use observer::{ISyncObserver, NoopObserver};
pub use source_tree::ISourceTreeProvider;
