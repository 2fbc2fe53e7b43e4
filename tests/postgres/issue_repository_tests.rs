//! CRUD and concurrency tests for the `PostgreSQL` issue repository.

use super::helpers;
use chrono::{DateTime, TimeZone, Utc};
use fabrica::issue::domain::{
    ArtifactId, CanonicalId, Issue, IssueId, IssueState, MirrorRef, PersistedIssueData, RepoCoords,
};
use fabrica::issue::ports::{IssueRepository, IssueRepositoryError, UpdateOutcome};

// Second-precision timestamps survive the TIMESTAMPTZ round trip, so
// whole-aggregate equality can be asserted.
fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 5, 10, minute, 0)
        .single()
        .expect("valid timestamp")
}

fn canonical(value: &str) -> CanonicalId {
    CanonicalId::new(value).expect("valid canonical id")
}

fn persisted_issue(value: &str, state: IssueState, version: u64) -> Issue {
    Issue::from_persisted(PersistedIssueData {
        id: IssueId::new(),
        canonical_id: canonical(value),
        state,
        mirror: None,
        version,
        created_at: at(0),
        updated_at: at(0),
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn stored_issues_round_trip_by_id_and_canonical_id() {
    let Some(repository) = helpers::issue_repository() else {
        return;
    };

    let issue = persisted_issue("PGI-1", IssueState::Created, 0);
    repository.store(&issue).await.expect("store issue");

    let by_id = repository
        .find_by_id(issue.id())
        .await
        .expect("find by id")
        .expect("issue stored");
    assert_eq!(by_id, issue);

    let by_canonical = repository
        .find_by_canonical_id(issue.canonical_id())
        .await
        .expect("find by canonical id")
        .expect("issue stored");
    assert_eq!(by_canonical, issue);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_issue_is_absent() {
    let Some(repository) = helpers::issue_repository() else {
        return;
    };

    let found = repository
        .find_by_id(IssueId::new())
        .await
        .expect("find by id");
    assert!(found.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn second_issue_with_the_same_canonical_id_is_rejected() {
    let Some(repository) = helpers::issue_repository() else {
        return;
    };

    let issue = persisted_issue("PGI-2", IssueState::Created, 0);
    repository.store(&issue).await.expect("store issue");

    let rival = persisted_issue("PGI-2", IssueState::Created, 0);
    let error = repository
        .store(&rival)
        .await
        .expect_err("duplicate canonical id accepted");
    match error {
        IssueRepositoryError::DuplicateCanonicalId(id) => assert_eq!(id.as_str(), "PGI-2"),
        other => panic!("expected DuplicateCanonicalId, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn guarded_update_applies_once_then_conflicts() {
    let Some(repository) = helpers::issue_repository() else {
        return;
    };

    let issue = persisted_issue("PGI-3", IssueState::Created, 0);
    repository.store(&issue).await.expect("store issue");

    let proposal = Issue::from_persisted(PersistedIssueData {
        id: issue.id(),
        canonical_id: canonical("PGI-3"),
        state: IssueState::SpecReady,
        mirror: None,
        version: 0,
        created_at: at(0),
        updated_at: at(1),
    });

    let outcome = repository.update(&proposal).await.expect("update issue");
    let updated = match outcome {
        UpdateOutcome::Updated(stored) => stored,
        UpdateOutcome::Conflict(stored) => panic!("unexpected conflict on {stored:?}"),
    };
    assert_eq!(updated.state(), IssueState::SpecReady);
    assert_eq!(updated.version(), 1);
    assert_eq!(updated.updated_at(), at(1));

    let replay = repository.update(&proposal).await.expect("replay update");
    let current = match replay {
        UpdateOutcome::Conflict(stored) => stored,
        UpdateOutcome::Updated(stored) => panic!("stale update applied to {stored:?}"),
    };
    assert_eq!(current.version(), 1);
    assert_eq!(current.state(), IssueState::SpecReady);
}

#[tokio::test(flavor = "multi_thread")]
async fn updating_a_missing_issue_reports_not_found() {
    let Some(repository) = helpers::issue_repository() else {
        return;
    };

    let ghost = persisted_issue("PGI-4", IssueState::Created, 0);
    let error = repository
        .update(&ghost)
        .await
        .expect_err("missing issue updated");
    match error {
        IssueRepositoryError::NotFound(id) => assert_eq!(id, ghost.id()),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn mirror_bindings_survive_the_jsonb_round_trip() {
    let Some(repository) = helpers::issue_repository() else {
        return;
    };

    let repo_coords = RepoCoords::new("octo", "widgets").expect("valid repo coords");
    let mirror = MirrorRef::new(
        repo_coords,
        ArtifactId::new(11).expect("valid artifact id"),
        "https://tracker.example/octo/widgets/issues/11",
    );
    let issue = Issue::from_persisted(PersistedIssueData {
        id: IssueId::new(),
        canonical_id: canonical("PGI-5"),
        state: IssueState::Implementing,
        mirror: Some(mirror.clone()),
        version: 3,
        created_at: at(0),
        updated_at: at(2),
    });
    repository.store(&issue).await.expect("store issue");

    let stored = repository
        .find_by_id(issue.id())
        .await
        .expect("find by id")
        .expect("issue stored");
    assert_eq!(stored.mirror(), Some(&mirror));
    assert_eq!(stored.version(), 3);
}
