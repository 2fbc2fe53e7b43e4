//! Domain types for pipeline orchestration.

mod policy;
mod target;

pub use policy::{CompletionPolicy, FailureDisposition};
pub use target::FabricationTarget;
