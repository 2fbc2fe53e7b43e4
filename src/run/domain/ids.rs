//! Identifier newtypes for external run tracking.

use super::RunDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a run ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunRecordId(Uuid);

impl RunRecordId {
    /// Creates a new random record identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a record identifier from an existing UUID.
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

impl Default for RunRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a CI workflow definition within a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(String);

impl WorkflowId {
    /// Creates a validated workflow identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RunDomainError::InvalidWorkflowId`] when the value is
    /// empty or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, RunDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
            return Err(RunDomainError::InvalidWorkflowId(raw));
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Returns the workflow identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for WorkflowId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-chosen token correlating a dispatch to the run it produced.
///
/// Typically the canonical issue identifier, optionally suffixed by the
/// caller to distinguish re-dispatches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// Longest correlation key accepted for persistence and dispatch.
    const MAX_LEN: usize = 256;

    /// Creates a validated correlation key.
    ///
    /// # Errors
    ///
    /// Returns [`RunDomainError::EmptyCorrelationKey`] when the value is
    /// empty after trimming, or [`RunDomainError::InvalidCorrelationKey`]
    /// when it contains interior whitespace or exceeds the length limit.
    pub fn new(value: impl Into<String>) -> Result<Self, RunDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(RunDomainError::EmptyCorrelationKey);
        }
        if normalized.chars().any(char::is_whitespace) || normalized.len() > Self::MAX_LEN {
            return Err(RunDomainError::InvalidCorrelationKey(raw));
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Returns the correlation key as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CorrelationKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Idempotency key for dispatches: one run per correlation key and
/// workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunKey {
    correlation_key: CorrelationKey,
    workflow_id: WorkflowId,
}

impl RunKey {
    /// Creates a run key.
    #[must_use]
    pub const fn new(correlation_key: CorrelationKey, workflow_id: WorkflowId) -> Self {
        Self {
            correlation_key,
            workflow_id,
        }
    }

    /// Returns the correlation key component.
    #[must_use]
    pub const fn correlation_key(&self) -> &CorrelationKey {
        &self.correlation_key
    }

    /// Returns the workflow identifier component.
    #[must_use]
    pub const fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.correlation_key, self.workflow_id)
    }
}

/// Run identifier assigned by the external CI provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalRunId(u64);

impl ExternalRunId {
    /// Largest run identifier representable in the current `PostgreSQL`
    /// schema.
    const MAX_PERSISTED_VALUE: u64 = i64::MAX as u64;

    /// Creates a validated external run identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RunDomainError::InvalidExternalRunId`] when the value is
    /// zero or exceeds the schema-backed maximum (`i64::MAX`).
    pub const fn new(value: u64) -> Result<Self, RunDomainError> {
        if value == 0 || value > Self::MAX_PERSISTED_VALUE {
            return Err(RunDomainError::InvalidExternalRunId(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExternalRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
