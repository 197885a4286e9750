//! vaultpush Core - Domain types and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `Fingerprint`, `BucketName`, `ObjectKey`, `SyncJob`, `Outcome`, `BatchResult`
//! - **Retry policy** - immutable attempt budget and delay schedule
//! - **Port definitions** - Traits for adapters: `IObjectStore`, `ISourceTreeProvider`, `ISyncObserver`
//! - **Configuration** - typed YAML configuration with validation
//!
//! # Architecture
//!
//! The domain module holds plain data and invariants with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`vaultpush-s3` for the object store, `vaultpush-sync` for the
//! source tree providers and the logging observer).

pub mod config;
pub mod domain;
pub mod ports;
