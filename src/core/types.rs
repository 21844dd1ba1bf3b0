//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RepoId`] - Stable numeric repository identifier
//! - [`FullName`] - Validated `owner/name` repository identifier
//! - [`PackageName`] - Validated reverse-domain package name (also the
//!   app-store docId)
//! - [`Fingerprint`] - Content hash of a canonical record set
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use playgraph::core::types::{FullName, PackageName};
//!
//! let repo = FullName::new("octocat/hello-world").unwrap();
//! assert_eq!(repo.owner(), "octocat");
//! assert_eq!(repo.name(), "hello-world");
//!
//! assert!(FullName::new("no-slash").is_err());
//! assert!(PackageName::new("com.example.app").is_ok());
//! assert!(PackageName::new("has space").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository id: {0}")]
    InvalidRepoId(String),

    #[error("invalid repository full name: {0}")]
    InvalidFullName(String),

    #[error("invalid package name: {0}")]
    InvalidPackageName(String),
}

/// A stable numeric repository identifier.
///
/// Ids originate from the upstream code-hosting platform and are globally
/// unique within a dataset. The sentinel `-1` used by the raw exports for
/// "no parent"/"no source" is not a valid `RepoId`; it parses to `None`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RepoId(i64);

impl RepoId {
    /// Create a repository id. Negative values are rejected.
    pub fn new(id: i64) -> Result<Self, TypeError> {
        if id < 0 {
            return Err(TypeError::InvalidRepoId(format!(
                "id must be non-negative, got {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Parse a raw reference cell, mapping the `-1` sentinel and empty
    /// cells to `None`.
    pub fn parse_reference(raw: i64) -> Option<Self> {
        if raw < 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// The numeric value.
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated `owner/name` repository identifier.
///
/// Full names have exactly one `/` separating two non-empty segments and
/// contain no whitespace or control characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FullName(String);

impl FullName {
    /// Create a new validated full name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidFullName` if the value is not of the form
    /// `owner/name`.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let mut parts = name.splitn(2, '/');
        let owner = parts.next().unwrap_or("");
        let repo = match parts.next() {
            Some(repo) => repo,
            None => {
                return Err(TypeError::InvalidFullName(format!(
                    "'{name}' is missing the '/' separator"
                )))
            }
        };
        if owner.is_empty() || repo.is_empty() {
            return Err(TypeError::InvalidFullName(format!(
                "'{name}' has an empty owner or name segment"
            )));
        }
        if repo.contains('/') {
            return Err(TypeError::InvalidFullName(format!(
                "'{name}' has more than one '/'"
            )));
        }
        if name
            .chars()
            .any(|c| c.is_whitespace() || c.is_ascii_control())
        {
            return Err(TypeError::InvalidFullName(format!(
                "'{name}' contains whitespace or control characters"
            )));
        }
        Ok(())
    }

    /// The owner segment.
    pub fn owner(&self) -> &str {
        self.0.split('/').next().unwrap_or("")
    }

    /// The repository name segment.
    pub fn name(&self) -> &str {
        self.0.splitn(2, '/').nth(1).unwrap_or("")
    }

    /// Get the full name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FullName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FullName> for String {
    fn from(value: FullName) -> Self {
        value.0
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated reverse-domain package name.
///
/// Package names double as the app-store docId: the store page for a package
/// is addressed by the same string the manifest declares.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    /// Create a new validated package name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::InvalidPackageName(
                "package name cannot be empty".into(),
            ));
        }
        if name
            .chars()
            .any(|c| c.is_whitespace() || c.is_ascii_control() || c == ',' || c == ';')
        {
            return Err(TypeError::InvalidPackageName(format!(
                "'{name}' contains whitespace or separator characters"
            )));
        }
        Ok(Self(name))
    }

    /// Get the package name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PackageName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PackageName> for String {
    fn from(value: PackageName) -> Self {
        value.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A content hash over a canonical record set.
///
/// Two consolidation runs over the same five layers must produce the same
/// fingerprint regardless of in-layer row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of serialized canonical content.
    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_id_rejects_negative() {
        assert!(RepoId::new(-1).is_err());
        assert!(RepoId::new(0).is_ok());
        assert_eq!(RepoId::new(42).unwrap().value(), 42);
    }

    #[test]
    fn reference_sentinel_parses_to_none() {
        assert_eq!(RepoId::parse_reference(-1), None);
        assert_eq!(RepoId::parse_reference(7), Some(RepoId::new(7).unwrap()));
    }

    #[test]
    fn full_name_splits_segments() {
        let name = FullName::new("owner/repo.name").unwrap();
        assert_eq!(name.owner(), "owner");
        assert_eq!(name.name(), "repo.name");
    }

    #[test]
    fn full_name_rejects_malformed() {
        assert!(FullName::new("").is_err());
        assert!(FullName::new("noslash").is_err());
        assert!(FullName::new("/leading").is_err());
        assert!(FullName::new("trailing/").is_err());
        assert!(FullName::new("a/b/c").is_err());
        assert!(FullName::new("has space/repo").is_err());
    }

    #[test]
    fn package_name_rejects_separators() {
        assert!(PackageName::new("com.example.app").is_ok());
        assert!(PackageName::new("").is_err());
        assert!(PackageName::new("a,b").is_err());
        assert!(PackageName::new("a;b").is_err());
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = Fingerprint::compute(b"canonical");
        let b = Fingerprint::compute(b"canonical");
        assert_eq!(a, b);
        assert_ne!(a, Fingerprint::compute(b"different"));
    }
}
