//! Normalized run status and the provider snapshot it derives from.

use super::ParseRunStatusError;
use serde::{Deserialize, Serialize};

/// Raw run state as reported by the CI provider.
///
/// Providers report a coarse `status` plus a `conclusion` that only
/// becomes meaningful once the status is `completed`. The pair is kept
/// verbatim for audit; consumers work with the normalized
/// [`RunStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRunSnapshot {
    /// Provider-reported status string.
    pub status: String,
    /// Provider-reported conclusion, absent until completion.
    pub conclusion: Option<String>,
}

impl RawRunSnapshot {
    /// Creates a raw snapshot.
    #[must_use]
    pub fn new(status: impl Into<String>, conclusion: Option<String>) -> Self {
        Self {
            status: status.into(),
            conclusion,
        }
    }
}

/// Normalized lifecycle status of an external run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run is accepted but not yet executing.
    Queued,
    /// The run is executing.
    Running,
    /// The run completed successfully. Terminal.
    Succeeded,
    /// The run completed unsuccessfully. Terminal.
    Failed,
    /// The run was cancelled before completing. Terminal.
    Cancelled,
}

impl RunStatus {
    /// Normalizes a provider snapshot into a [`RunStatus`].
    ///
    /// The mapping is total: `completed` resolves through the conclusion
    /// (`success`, `failure`, `cancelled`; anything else, including a
    /// missing conclusion, counts as `Failed`); `in_progress` maps to
    /// `Running`; every other status, known or not, maps to `Queued`.
    #[must_use]
    pub fn from_raw(raw: &RawRunSnapshot) -> Self {
        let status = raw.status.trim().to_ascii_lowercase();
        if status == "completed" {
            let conclusion = raw
                .conclusion
                .as_deref()
                .map(|value| value.trim().to_ascii_lowercase());
            return match conclusion.as_deref() {
                Some("success") => Self::Succeeded,
                Some("cancelled") => Self::Cancelled,
                _ => Self::Failed,
            };
        }
        if status == "in_progress" {
            return Self::Running;
        }
        Self::Queued
    }

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether the status can never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl TryFrom<&str> for RunStatus {
    type Error = ParseRunStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseRunStatusError(value.to_owned())),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
