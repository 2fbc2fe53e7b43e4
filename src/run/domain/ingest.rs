//! Terminal run result payloads.

use super::{RunDomainError, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Overall outcome of a terminal run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Normalized terminal status.
    pub status: RunStatus,
    /// Provider-reported conclusion, kept verbatim.
    pub conclusion: Option<String>,
    /// When the run started executing.
    pub started_at: Option<DateTime<Utc>>,
    /// When the run reached its terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Outcome of a single job within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Job name as reported by the provider.
    pub name: String,
    /// Provider-reported job status, kept verbatim.
    pub status: String,
    /// Provider-reported job conclusion, kept verbatim.
    pub conclusion: Option<String>,
    /// Job wall-clock duration in whole seconds, when derivable.
    pub duration_secs: Option<u64>,
}

/// Metadata for an artifact produced by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Artifact name.
    pub name: String,
    /// Artifact size in bytes.
    pub size_bytes: u64,
    /// Reference for downloading the artifact content.
    pub download_ref: String,
}

/// Immutable result payload captured from a terminal run.
///
/// Assembled exactly once per run; re-ingest returns the stored payload
/// byte-identically. The digest covers the canonical JSON serialization
/// of every field except itself, so independently assembled payloads can
/// be compared without field-by-field inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestedResult {
    /// Overall run outcome.
    pub summary: RunSummary,
    /// Per-job outcomes in provider order.
    pub jobs: Vec<JobResult>,
    /// Artifact metadata in provider order.
    pub artifacts: Vec<ArtifactMeta>,
    /// Reference to the run's log archive, when the provider exposes one.
    pub logs_ref: Option<String>,
    /// Lowercase-hex SHA-256 over the canonical payload serialization.
    pub digest: String,
}

#[derive(Serialize)]
struct DigestPayload<'a> {
    summary: &'a RunSummary,
    jobs: &'a [JobResult],
    artifacts: &'a [ArtifactMeta],
    logs_ref: Option<&'a str>,
}

impl IngestedResult {
    /// Assembles a result payload and computes its digest.
    ///
    /// # Errors
    ///
    /// Returns [`RunDomainError::IngestSerialization`] when the payload
    /// cannot be serialized for digesting.
    pub fn assemble(
        summary: RunSummary,
        jobs: Vec<JobResult>,
        artifacts: Vec<ArtifactMeta>,
        logs_ref: Option<String>,
    ) -> Result<Self, RunDomainError> {
        let canonical = serde_json::to_vec(&DigestPayload {
            summary: &summary,
            jobs: &jobs,
            artifacts: &artifacts,
            logs_ref: logs_ref.as_deref(),
        })
        .map_err(|error| RunDomainError::IngestSerialization(error.to_string()))?;
        let digest = format!("{:x}", Sha256::digest(&canonical));

        Ok(Self {
            summary,
            jobs,
            artifacts,
            logs_ref,
            digest,
        })
    }
}
