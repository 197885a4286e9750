//! Source tree port (driven/secondary port)
//!
//! Produces the local directory a sync run reads from. Implementations may
//! simply point at an existing directory or fetch a fresh checkout first.
//! Uses `anyhow::Result` because failures here are adapter-specific.

use std::path::PathBuf;

/// Port trait for obtaining the local tree to sync
#[async_trait::async_trait]
pub trait ISourceTreeProvider: Send + Sync {
    /// Makes the tree available and returns its root directory
    async fn materialize(&self) -> anyhow::Result<PathBuf>;

    /// Short human-readable description used in logs
    fn describe(&self) -> String;
}
