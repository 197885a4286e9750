//! Tree walker
//!
//! Lazily enumerates the regular files under a root directory, yielding
//! each file's absolute path together with its path relative to the root.
//! Directory handling is driven by a [`PathPolicy`] that classifies every
//! entry name as descend, flatten or skip.
//!
//! ## Error policy
//!
//! Any I/O failure while enumerating (unreadable directory, broken
//! symlink) aborts the whole walk. A partial tree would silently omit
//! files from the batch.
//!
//! ## Symlinks
//!
//! Symlinks to files are followed and yielded under the link's own name.
//! Symlinks to directories are not descended, which rules out cycles.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::ReadDir;
use tracing::debug;

use vaultpush_core::config::RoutingConfig;
use vaultpush_core::domain::{DomainError, JobId};

/// Errors that abort a walk
#[derive(Debug, Error)]
pub enum WalkError {
    /// A directory or entry could not be read
    #[error("failed to enumerate {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A relative path could not be turned into an object key
    #[error("invalid object key for {path}: {source}")]
    InvalidKey {
        path: PathBuf,
        #[source]
        source: DomainError,
    },

    /// Two files resolve to the same bucket and key
    #[error("duplicate object {job}: {first} and {second}")]
    DuplicateKey {
        job: JobId,
        first: PathBuf,
        second: PathBuf,
    },
}

impl WalkError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        WalkError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ============================================================================
// Path policy
// ============================================================================

/// What to do with a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentAction {
    /// Recurse, keeping the segment in the relative path
    Descend,
    /// Recurse, keying contents as if they lived in the parent
    Flatten,
    /// Ignore the entry and everything below it
    Skip,
}

/// Classifies entry names during a walk
#[derive(Debug, Clone, Default)]
pub struct PathPolicy {
    flatten: HashSet<String>,
    skip: HashSet<String>,
    skip_hidden: bool,
}

impl PathPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lift the contents of directories named `name` into their parent.
    #[must_use]
    pub fn flatten(mut self, name: impl Into<String>) -> Self {
        self.flatten.insert(name.into());
        self
    }

    /// Ignore entries named `name`.
    #[must_use]
    pub fn skip(mut self, name: impl Into<String>) -> Self {
        self.skip.insert(name.into());
        self
    }

    /// Ignore entries whose name starts with `.`.
    #[must_use]
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Policy described by the routing section of the configuration.
    #[must_use]
    pub fn from_config(routing: &RoutingConfig) -> Self {
        routing
            .flatten_dirs
            .iter()
            .fold(Self::new(), |policy, name| policy.flatten(name.clone()))
            .skip_hidden(routing.skip_hidden)
    }

    /// Decides how to treat an entry called `name`.
    ///
    /// `Flatten` only has meaning for directories; files classified as
    /// `Flatten` are yielded normally.
    #[must_use]
    pub fn classify(&self, name: &str) -> SegmentAction {
        if self.skip.contains(name) || (self.skip_hidden && name.starts_with('.')) {
            SegmentAction::Skip
        } else if self.flatten.contains(name) {
            SegmentAction::Flatten
        } else {
            SegmentAction::Descend
        }
    }
}

// ============================================================================
// TreeWalker
// ============================================================================

/// A regular file found by the walker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub absolute: PathBuf,
    /// Path relative to the walk root, with flattened segments removed
    pub relative: PathBuf,
}

/// Open directory plus the relative prefix its children receive
struct Frame {
    dir: PathBuf,
    entries: ReadDir,
    prefix: PathBuf,
}

/// Lazy depth-first walk over a directory tree
///
/// Restartable by constructing a new walker for the same root.
pub struct TreeWalker {
    root: PathBuf,
    policy: PathPolicy,
    stack: Vec<Frame>,
    started: bool,
}

impl TreeWalker {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, policy: PathPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
            stack: Vec::new(),
            started: false,
        }
    }

    async fn push_dir(&mut self, dir: PathBuf, prefix: PathBuf) -> Result<(), WalkError> {
        let entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| WalkError::io(&dir, e))?;
        self.stack.push(Frame {
            dir,
            entries,
            prefix,
        });
        Ok(())
    }

    /// Returns the next regular file, or `None` when the walk is complete
    ///
    /// After an error the walker is exhausted.
    pub async fn next_entry(&mut self) -> Result<Option<WalkEntry>, WalkError> {
        if !self.started {
            self.started = true;
            let root = self.root.clone();
            self.push_dir(root, PathBuf::new()).await?;
        }

        let result = self.advance().await;
        if result.is_err() {
            self.stack.clear();
        }
        result
    }

    async fn advance(&mut self) -> Result<Option<WalkEntry>, WalkError> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };

            let entry = frame
                .entries
                .next_entry()
                .await
                .map_err(|e| WalkError::io(&frame.dir, e))?;

            let Some(entry) = entry else {
                self.stack.pop();
                continue;
            };

            let prefix = frame.prefix.clone();
            let path = entry.path();
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            let action = self.policy.classify(&name_str);
            if action == SegmentAction::Skip {
                debug!(path = %path.display(), "Skipping entry by policy");
                continue;
            }

            let file_type = entry
                .file_type()
                .await
                .map_err(|e| WalkError::io(&path, e))?;

            if file_type.is_dir() {
                let child_prefix = match action {
                    SegmentAction::Flatten => prefix,
                    _ => prefix.join(&name),
                };
                self.push_dir(path, child_prefix).await?;
                continue;
            }

            let is_file = if file_type.is_symlink() {
                // Follows the link; a dangling target fails here
                let target = tokio::fs::metadata(&path)
                    .await
                    .map_err(|e| WalkError::io(&path, e))?;
                if target.is_dir() {
                    debug!(path = %path.display(), "Not descending into symlinked directory");
                }
                target.is_file()
            } else {
                file_type.is_file()
            };

            if is_file {
                return Ok(Some(WalkEntry {
                    relative: prefix.join(&name),
                    absolute: path,
                }));
            }
        }
    }

    /// Drains the walker into a vector
    pub async fn collect(mut self) -> Result<Vec<WalkEntry>, WalkError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry().await? {
            entries.push(entry);
        }
        Ok(entries)
    }
}
