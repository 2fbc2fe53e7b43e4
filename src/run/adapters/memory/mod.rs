//! In-memory run adapters for unit and behaviour tests.

mod ledger;
mod workflow;

pub use ledger::InMemoryRunLedger;
pub use workflow::{InMemoryWorkflowClient, ScriptedRun, TriggeredWorkflow};
