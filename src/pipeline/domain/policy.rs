//! Policy mapping terminal run outcomes to issue dispositions.

use serde::{Deserialize, Serialize};

/// Where an issue goes when its fabrication run ends unsuccessfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureDisposition {
    /// Keep the issue in `Implementing` for another attempt.
    StayImplementing,
    /// Park the issue in `Hold` for operator review.
    MoveToHold,
}

/// Completion policy for terminal fabrication runs.
///
/// A succeeded run always proposes `Verified`; this policy only decides
/// what the unsuccessful outcomes do. Whatever it proposes still passes
/// through the issue state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionPolicy {
    /// Disposition applied when the run failed.
    pub on_failure: FailureDisposition,
    /// Disposition applied when the run was cancelled.
    pub on_cancelled: FailureDisposition,
}

impl Default for CompletionPolicy {
    /// Failures stay in `Implementing` for a retry; cancellations are
    /// parked in `Hold` because someone chose to stop the run.
    fn default() -> Self {
        Self {
            on_failure: FailureDisposition::StayImplementing,
            on_cancelled: FailureDisposition::MoveToHold,
        }
    }
}
