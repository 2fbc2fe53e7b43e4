//! Pipeline orchestration services.

mod orchestrator;

pub use orchestrator::{
    AbsorbOutcome, AdvanceOutcome, AdvanceRequest, CANONICAL_ID_INPUT, MirrorOutcome,
    PipelineError, PipelineService,
};
