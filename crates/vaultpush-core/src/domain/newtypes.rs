//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Fingerprint
// ============================================================================

/// Hex-encoded SHA-256 digest of a file's content
///
/// Two files are considered identical iff their fingerprints are equal.
/// Format: 64 lowercase hexadecimal characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Length of a hex-encoded SHA-256 digest
    pub const HEX_LEN: usize = 64;

    /// Create a new Fingerprint
    ///
    /// Uppercase hex input is accepted and normalized to lowercase, since
    /// some stores echo user metadata back with altered case.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidFingerprint` if the value is not 64 hex digits
    pub fn new(hex: impl Into<String>) -> Result<Self, DomainError> {
        let hex = hex.into();
        if hex.len() != Self::HEX_LEN {
            return Err(DomainError::InvalidFingerprint(format!(
                "expected {} hex characters, got {}",
                Self::HEX_LEN,
                hex.len()
            )));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidFingerprint(format!(
                "not hexadecimal: {hex}"
            )));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares against a digest string surfaced by the object store
    ///
    /// The comparison is case-insensitive and ignores surrounding quotes,
    /// which some S3-compatible stores keep around checksum values.
    #[must_use]
    pub fn matches(&self, digest: &str) -> bool {
        digest.trim_matches('"').eq_ignore_ascii_case(&self.0)
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

// ============================================================================
// BucketName
// ============================================================================

/// An S3-compatible bucket name
///
/// Must be 3-63 characters of lowercase letters, digits, `-` and `.`,
/// starting and ending with a letter or digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BucketName(String);

impl BucketName {
    const MIN_LEN: usize = 3;
    const MAX_LEN: usize = 63;

    /// Create a new BucketName
    ///
    /// # Errors
    /// Returns `DomainError::InvalidBucketName` if the name breaks S3 naming rules
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let len = name.len();
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&len) {
            return Err(DomainError::InvalidBucketName(format!(
                "{name:?} must be {}-{} characters",
                Self::MIN_LEN,
                Self::MAX_LEN
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        {
            return Err(DomainError::InvalidBucketName(format!(
                "{name:?} may only contain lowercase letters, digits, '-' and '.'"
            )));
        }
        let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
        if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
            return Err(DomainError::InvalidBucketName(format!(
                "{name:?} must start and end with a letter or digit"
            )));
        }
        Ok(Self(name))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BucketName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for BucketName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BucketName> for String {
    fn from(bucket: BucketName) -> Self {
        bucket.0
    }
}

// ============================================================================
// ObjectKey
// ============================================================================

/// A POSIX-style object key relative to a bucket's subtree root
///
/// Keys use forward slashes, never start with `/`, and contain no empty,
/// `.` or `..` segments. Example: `NewPost1/Resources/Image1.png`.
/// Other characters, backslashes included, are ordinary key bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Create a new ObjectKey from a slash-separated string
    ///
    /// # Errors
    /// Returns `DomainError::InvalidObjectKey` for empty, absolute or
    /// traversal keys
    pub fn new(key: impl Into<String>) -> Result<Self, DomainError> {
        let key = key.into();
        if key.is_empty() {
            return Err(DomainError::InvalidObjectKey(
                "key cannot be empty".to_string(),
            ));
        }
        if key.starts_with('/') {
            return Err(DomainError::InvalidObjectKey(format!(
                "key must be relative: {key}"
            )));
        }
        if key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(DomainError::InvalidObjectKey(format!(
                "key contains an empty or relative segment: {key}"
            )));
        }
        Ok(Self(key))
    }

    /// Build a key from a relative filesystem path
    ///
    /// # Errors
    /// Returns `DomainError::InvalidObjectKey` if the path is absolute,
    /// contains `..`, or is not valid UTF-8
    pub fn from_relative_path(path: &Path) -> Result<Self, DomainError> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(segment) => {
                    let segment = segment.to_str().ok_or_else(|| {
                        DomainError::InvalidObjectKey(format!(
                            "path is not valid UTF-8: {}",
                            path.display()
                        ))
                    })?;
                    segments.push(segment);
                }
                Component::CurDir => {}
                _ => {
                    return Err(DomainError::InvalidObjectKey(format!(
                        "path must be relative without '..': {}",
                        path.display()
                    )))
                }
            }
        }
        Self::new(segments.join("/"))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ObjectKey> for String {
    fn from(key: ObjectKey) -> Self {
        key.0
    }
}

// ============================================================================
// Tests
// ============================================================================
