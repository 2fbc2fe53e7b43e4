//! Poll observations applied to run records by recency.

use super::{RawRunSnapshot, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single poll of an external run.
///
/// `observed_at` is captured before the provider call is issued, so
/// observations racing through concurrent pollers are ordered by when
/// they were taken, not by when their writes arrive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollObservation {
    /// When the observation was captured.
    pub observed_at: DateTime<Utc>,
    /// Provider snapshot at observation time.
    pub raw: RawRunSnapshot,
    /// Normalized status derived from the snapshot.
    pub status: RunStatus,
    /// Run browse URL, when the provider reports one.
    pub run_url: Option<String>,
}

impl PollObservation {
    /// Creates an observation, normalizing the snapshot.
    #[must_use]
    pub fn new(observed_at: DateTime<Utc>, raw: RawRunSnapshot, run_url: Option<String>) -> Self {
        let status = RunStatus::from_raw(&raw);
        Self {
            observed_at,
            raw,
            status,
            run_url,
        }
    }
}
