//! Domain error types for external run tracking.

use thiserror::Error;

/// Validation failures raised by run domain constructors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunDomainError {
    /// Workflow identifiers must be non-empty without whitespace.
    #[error("invalid workflow identifier: {0:?}")]
    InvalidWorkflowId(String),

    /// Correlation keys must be non-empty after trimming.
    #[error("correlation key must not be empty")]
    EmptyCorrelationKey,

    /// Correlation keys must be single-token and bounded in size.
    #[error("invalid correlation key: {0:?}")]
    InvalidCorrelationKey(String),

    /// External run identifiers are positive and fit the persisted range.
    #[error("invalid external run identifier: {0}")]
    InvalidExternalRunId(u64),

    /// An ingest payload could not be serialized for digesting.
    #[error("ingest payload serialization failed: {0}")]
    IngestSerialization(String),
}

/// Error raised when parsing a persisted run status representation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognised run status: {0:?}")]
pub struct ParseRunStatusError(pub String);
