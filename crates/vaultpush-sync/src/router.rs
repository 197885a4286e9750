//! Bucket router
//!
//! Maps a top-level directory name to its target bucket. A name of the form
//! `"<code><separator><label>"` whose code is one of the configured prefixes
//! resolves to `lowercase(label)`; every other name is excluded from sync.

use tracing::debug;

use vaultpush_core::config::RoutingConfig;
use vaultpush_core::domain::BucketName;

/// Resolves top-level directory names to buckets
#[derive(Debug, Clone)]
pub struct BucketRouter {
    prefixes: Vec<String>,
    separator: String,
}

impl BucketRouter {
    #[must_use]
    pub fn new<I, S>(prefixes: I, separator: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            separator: separator.into(),
        }
    }

    #[must_use]
    pub fn from_config(routing: &RoutingConfig) -> Self {
        Self::new(routing.prefixes.iter().cloned(), routing.separator.clone())
    }

    /// Returns the bucket for `dir_name`, or `None` if the directory is not synced
    ///
    /// Labels that do not form a valid bucket name once lower-cased are
    /// treated as not applicable.
    #[must_use]
    pub fn resolve(&self, dir_name: &str) -> Option<BucketName> {
        if self.separator.is_empty() {
            return None;
        }
        let (code, label) = dir_name.split_once(self.separator.as_str())?;
        if !self.prefixes.iter().any(|p| p == code.trim()) {
            return None;
        }

        let label = label.trim().to_lowercase();
        match BucketName::new(label) {
            Ok(bucket) => Some(bucket),
            Err(err) => {
                debug!(dir = dir_name, %err, "Recognized prefix but label is not a bucket name");
                None
            }
        }
    }
}

impl Default for BucketRouter {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default())
    }
}
