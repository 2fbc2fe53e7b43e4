//! Domain model for external run tracking.
//!
//! The run domain models dispatch idempotency keys, normalized run
//! status, the ledger record aggregate, and the immutable ingest payload
//! captured from terminal runs.

mod error;
mod ids;
mod ingest;
mod poll;
mod record;
mod status;

pub use error::{ParseRunStatusError, RunDomainError};
pub use ids::{CorrelationKey, ExternalRunId, RunKey, RunRecordId, WorkflowId};
pub use ingest::{ArtifactMeta, IngestedResult, JobResult, RunSummary};
pub use poll::PollObservation;
pub use record::{DispatchedRun, PersistedRunRecordData, RunRecord};
pub use status::{RawRunSnapshot, RunStatus};
