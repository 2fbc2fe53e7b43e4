//! Application services for issue lifecycle orchestration.

mod lifecycle;

pub use lifecycle::{IssueLifecycleError, IssueLifecycleResult, IssueLifecycleService};
