//! Source tree providers
//!
//! - [`LocalDirectoryProvider`] - syncs an existing directory as-is
//! - [`GitCheckoutProvider`] - clones a repository fresh before every run

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::process::Command;
use tracing::{debug, info};

use vaultpush_core::config::{SourceConfig, SourceKind};
use vaultpush_core::ports::ISourceTreeProvider;

/// Builds the provider selected by the `source` configuration section
pub fn provider_from_config(source: &SourceConfig) -> anyhow::Result<Arc<dyn ISourceTreeProvider>> {
    match source.kind {
        SourceKind::Local => Ok(Arc::new(LocalDirectoryProvider::new(source.path.clone()))),
        SourceKind::Git => {
            let url = source
                .git_url
                .clone()
                .context("source.git_url is required for git sources")?;
            let mut provider = GitCheckoutProvider::new(url, source.path.clone());
            if let Some(key) = &source.ssh_key_path {
                provider = provider.with_ssh_key(key.clone());
            }
            Ok(Arc::new(provider))
        }
    }
}

// ============================================================================
// LocalDirectoryProvider
// ============================================================================

/// Uses an existing directory as the sync root
#[derive(Debug, Clone)]
pub struct LocalDirectoryProvider {
    root: PathBuf,
}

impl LocalDirectoryProvider {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl ISourceTreeProvider for LocalDirectoryProvider {
    async fn materialize(&self) -> anyhow::Result<PathBuf> {
        let metadata = tokio::fs::metadata(&self.root)
            .await
            .with_context(|| format!("source directory {} is not accessible", self.root.display()))?;
        if !metadata.is_dir() {
            bail!("source path {} is not a directory", self.root.display());
        }
        let root = tokio::fs::canonicalize(&self.root)
            .await
            .with_context(|| format!("failed to resolve {}", self.root.display()))?;
        debug!(root = %root.display(), "Using local source directory");
        Ok(root)
    }

    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }
}

// ============================================================================
// GitCheckoutProvider
// ============================================================================

/// Clones a git repository into a scratch directory before every run
///
/// Any existing checkout is deleted first, so each run sees exactly the
/// remote's default branch.
#[derive(Debug, Clone)]
pub struct GitCheckoutProvider {
    url: String,
    checkout_dir: PathBuf,
    ssh_key: Option<PathBuf>,
}

impl GitCheckoutProvider {
    #[must_use]
    pub fn new(url: impl Into<String>, checkout_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            checkout_dir: checkout_dir.into(),
            ssh_key: None,
        }
    }

    /// Authenticate over SSH with the private key at `path`.
    #[must_use]
    pub fn with_ssh_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.ssh_key = Some(path.into());
        self
    }

    fn ssh_command(key: &Path) -> String {
        format!(
            "ssh -i '{}' -o IdentitiesOnly=yes -o StrictHostKeyChecking=accept-new",
            key.display()
        )
    }

    async fn remove_stale_checkout(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_dir_all(&self.checkout_dir).await {
            Ok(()) => {
                debug!(dir = %self.checkout_dir.display(), "Removed previous checkout");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| {
                format!("failed to remove {}", self.checkout_dir.display())
            }),
        }
    }
}

#[async_trait::async_trait]
impl ISourceTreeProvider for GitCheckoutProvider {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn materialize(&self) -> anyhow::Result<PathBuf> {
        if let Some(key) = &self.ssh_key {
            tokio::fs::metadata(key)
                .await
                .with_context(|| format!("ssh key {} is not readable", key.display()))?;
        }

        self.remove_stale_checkout().await?;

        let mut command = Command::new("git");
        command
            .arg("clone")
            .arg("--recurse-submodules")
            .arg(&self.url)
            .arg(&self.checkout_dir)
            .kill_on_drop(true);
        if let Some(key) = &self.ssh_key {
            command.env("GIT_SSH_COMMAND", Self::ssh_command(key));
        }

        info!(dir = %self.checkout_dir.display(), "Cloning repository");
        let output = command
            .output()
            .await
            .context("failed to run git; is it installed?")?;
        if !output.status.success() {
            bail!(
                "git clone of {} failed ({}): {}",
                self.url,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        tokio::fs::canonicalize(&self.checkout_dir)
            .await
            .with_context(|| format!("failed to resolve {}", self.checkout_dir.display()))
    }

    fn describe(&self) -> String {
        format!("git:{}", self.url)
    }
}
