//! Normalization grid for provider run snapshots.

use crate::run::domain::{RawRunSnapshot, RunStatus};
use rstest::rstest;

fn raw(status: &str, conclusion: Option<&str>) -> RawRunSnapshot {
    RawRunSnapshot::new(status, conclusion.map(str::to_owned))
}

#[rstest]
#[case("queued", None, RunStatus::Queued)]
#[case("waiting", None, RunStatus::Queued)]
#[case("requested", None, RunStatus::Queued)]
#[case("pending", None, RunStatus::Queued)]
#[case("some_future_status", None, RunStatus::Queued)]
#[case("in_progress", None, RunStatus::Running)]
#[case("completed", Some("success"), RunStatus::Succeeded)]
#[case("completed", Some("failure"), RunStatus::Failed)]
#[case("completed", Some("cancelled"), RunStatus::Cancelled)]
#[case("completed", Some("timed_out"), RunStatus::Failed)]
#[case("completed", Some("skipped"), RunStatus::Failed)]
#[case("completed", Some("neutral"), RunStatus::Failed)]
#[case("completed", Some("action_required"), RunStatus::Failed)]
#[case("completed", Some("startup_failure"), RunStatus::Failed)]
#[case("completed", None, RunStatus::Failed)]
fn normalization_is_total_over_provider_snapshots(
    #[case] status: &str,
    #[case] conclusion: Option<&str>,
    #[case] expected: RunStatus,
) {
    assert_eq!(RunStatus::from_raw(&raw(status, conclusion)), expected);
}

#[rstest]
#[case(" Completed ", Some(" SUCCESS "), RunStatus::Succeeded)]
#[case("IN_PROGRESS", None, RunStatus::Running)]
#[case("Queued", None, RunStatus::Queued)]
fn normalization_tolerates_case_and_whitespace(
    #[case] status: &str,
    #[case] conclusion: Option<&str>,
    #[case] expected: RunStatus,
) {
    assert_eq!(RunStatus::from_raw(&raw(status, conclusion)), expected);
}

#[rstest]
#[case("in_progress", Some("success"), RunStatus::Running)]
#[case("queued", Some("failure"), RunStatus::Queued)]
fn conclusion_is_ignored_until_completion(
    #[case] status: &str,
    #[case] conclusion: Option<&str>,
    #[case] expected: RunStatus,
) {
    assert_eq!(RunStatus::from_raw(&raw(status, conclusion)), expected);
}

#[rstest]
#[case(RunStatus::Queued, false)]
#[case(RunStatus::Running, false)]
#[case(RunStatus::Succeeded, true)]
#[case(RunStatus::Failed, true)]
#[case(RunStatus::Cancelled, true)]
fn terminality_covers_every_status(#[case] status: RunStatus, #[case] expected: bool) {
    assert_eq!(status.is_terminal(), expected);
}

#[rstest]
fn unknown_persisted_status_is_rejected() {
    let result = RunStatus::try_from("paused");
    assert!(result.is_err());
}
