//! Application services for run dispatch, poll, and ingest.

mod dispatch;

pub use dispatch::{
    DispatchError, DispatchReceipt, DispatchRequest, IngestError, PollError, PollSnapshot,
    RetryPolicy, RunDispatchService,
};
