//! Port contracts for external run tracking.
//!
//! Ports define infrastructure-agnostic interfaces used by the dispatch,
//! poll, and ingest services.

pub mod ledger;
pub mod workflow;

pub use ledger::{
    IngestStored, InsertOutcome, PollApplied, RunLedger, RunLedgerError, RunLedgerResult,
};
pub use workflow::{
    CORRELATION_TOKEN_INPUT, RunFilter, WorkflowArtifact, WorkflowClient, WorkflowError,
    WorkflowInputs, WorkflowJob, WorkflowResult, WorkflowRun,
};
