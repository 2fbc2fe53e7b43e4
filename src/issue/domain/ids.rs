//! Identifier and validated scalar types for the issue domain.

use super::IssueDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an internal issue record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(Uuid);

impl IssueId {
    /// Creates a new random issue identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an issue identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for IssueId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Uuid> for IssueId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable, caller-assigned identifier correlating an internal issue to at
/// most one external mirror artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    /// Longest canonical identifier accepted for persistence and markers.
    const MAX_LEN: usize = 128;

    /// Creates a validated canonical identifier.
    ///
    /// Leading and trailing whitespace is stripped before validation.
    ///
    /// # Errors
    ///
    /// Returns [`IssueDomainError::EmptyCanonicalId`] when the value is empty
    /// after trimming, or [`IssueDomainError::InvalidCanonicalId`] when it
    /// contains interior whitespace or exceeds the length limit.
    pub fn new(value: impl Into<String>) -> Result<Self, IssueDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(IssueDomainError::EmptyCanonicalId);
        }
        if normalized.chars().any(char::is_whitespace) || normalized.len() > Self::MAX_LEN {
            return Err(IssueDomainError::InvalidCanonicalId(raw));
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Returns the canonical identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CanonicalId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External repository coordinates as a validated `owner`/`name` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoCoords {
    owner: String,
    name: String,
}

impl RepoCoords {
    /// Creates validated repository coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`IssueDomainError::InvalidRepo`] when either segment is
    /// empty, contains whitespace, or contains a slash.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, IssueDomainError> {
        let raw_owner = owner.into();
        let raw_name = name.into();
        let owner_trimmed = raw_owner.trim();
        let name_trimmed = raw_name.trim();
        let segment_ok = |segment: &str| {
            !segment.is_empty()
                && !segment.contains('/')
                && !segment.chars().any(char::is_whitespace)
        };
        if !segment_ok(owner_trimmed) || !segment_ok(name_trimmed) {
            return Err(IssueDomainError::InvalidRepo(format!(
                "{raw_owner}/{raw_name}"
            )));
        }

        Ok(Self {
            owner: owner_trimmed.to_owned(),
            name: name_trimmed.to_owned(),
        })
    }

    /// Parses coordinates from a single `owner/name` value.
    ///
    /// # Errors
    ///
    /// Returns [`IssueDomainError::InvalidRepo`] when the value does not
    /// contain exactly one slash-delimited owner and name segment.
    pub fn parse(value: &str) -> Result<Self, IssueDomainError> {
        let normalized = value.trim();
        let Some((owner, name)) = normalized.split_once('/') else {
            return Err(IssueDomainError::InvalidRepo(value.to_owned()));
        };
        Self::new(owner, name)
    }

    /// Returns the repository owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepoCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Positive artifact number assigned by the external tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(u64);

impl ArtifactId {
    /// Largest artifact number representable in the current `PostgreSQL`
    /// schema.
    const MAX_PERSISTED_VALUE: u64 = i64::MAX as u64;

    /// Creates a validated artifact number.
    ///
    /// # Errors
    ///
    /// Returns [`IssueDomainError::InvalidArtifactId`] when the value is zero
    /// or exceeds the schema-backed maximum (`i64::MAX`).
    pub const fn new(value: u64) -> Result<Self, IssueDomainError> {
        if value == 0 || value > Self::MAX_PERSISTED_VALUE {
            return Err(IssueDomainError::InvalidArtifactId(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
