//! Idempotency, poll-guard, and ingest tests for the `PostgreSQL` run
//! ledger.

use super::helpers;
use chrono::{DateTime, TimeZone, Utc};
use fabrica::issue::domain::RepoCoords;
use fabrica::run::adapters::postgres::PostgresRunLedger;
use fabrica::run::domain::{
    CorrelationKey, ExternalRunId, IngestedResult, JobResult, PersistedRunRecordData,
    PollObservation, RawRunSnapshot, RunKey, RunRecord, RunRecordId, RunStatus, RunSummary,
    WorkflowId,
};
use fabrica::run::ports::{IngestStored, InsertOutcome, PollApplied, RunLedger, RunLedgerError};

// Second-precision timestamps survive the TIMESTAMPTZ round trip, so
// whole-record equality can be asserted.
fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 5, 12, minute, 0)
        .single()
        .expect("valid timestamp")
}

fn repo() -> RepoCoords {
    RepoCoords::new("octo", "widgets").expect("valid repo coords")
}

fn run_key(correlation: &str, workflow: &str) -> RunKey {
    let key = CorrelationKey::new(correlation).expect("valid correlation key");
    RunKey::new(key, WorkflowId::new(workflow).expect("valid workflow id"))
}

fn queued_record(correlation: &str, external: u64) -> RunRecord {
    queued_record_with_id(RunRecordId::new(), correlation, external)
}

fn queued_record_with_id(id: RunRecordId, correlation: &str, external: u64) -> RunRecord {
    RunRecord::from_persisted(PersistedRunRecordData {
        id,
        key: run_key(correlation, "fabricate.yml"),
        repo: repo(),
        git_ref: "main".to_owned(),
        external_run_id: Some(ExternalRunId::new(external).expect("valid run id")),
        run_url: Some(format!("https://ci.example/octo/widgets/runs/{external}")),
        status: RunStatus::Queued,
        raw: None,
        dispatched_at: at(0),
        last_polled_at: None,
        completed_at: None,
        ingested: None,
        created_at: at(0),
        updated_at: at(0),
    })
}

fn failed_start_record(correlation: &str) -> RunRecord {
    RunRecord::from_persisted(PersistedRunRecordData {
        id: RunRecordId::new(),
        key: run_key(correlation, "fabricate.yml"),
        repo: repo(),
        git_ref: "main".to_owned(),
        external_run_id: None,
        run_url: None,
        status: RunStatus::Failed,
        raw: None,
        dispatched_at: at(0),
        last_polled_at: None,
        completed_at: None,
        ingested: None,
        created_at: at(0),
        updated_at: at(0),
    })
}

fn observation(minute: u32, status: &str, conclusion: Option<&str>) -> PollObservation {
    PollObservation::new(
        at(minute),
        RawRunSnapshot::new(status, conclusion.map(str::to_owned)),
        None,
    )
}

fn sample_payload(logs: &str) -> IngestedResult {
    IngestedResult::assemble(
        RunSummary {
            status: RunStatus::Succeeded,
            conclusion: Some("success".to_owned()),
            started_at: Some(at(1)),
            completed_at: Some(at(2)),
        },
        vec![JobResult {
            name: "fabricate".to_owned(),
            status: "completed".to_owned(),
            conclusion: Some("success".to_owned()),
            duration_secs: Some(90),
        }],
        Vec::new(),
        Some(logs.to_owned()),
    )
    .expect("assemble payload")
}

async fn insert(ledger: &PostgresRunLedger, record: &RunRecord) {
    let outcome = ledger
        .insert_if_absent(record)
        .await
        .expect("insert record");
    assert_eq!(outcome, InsertOutcome::Inserted);
}

#[tokio::test(flavor = "multi_thread")]
async fn insert_if_absent_inserts_then_returns_the_key_holder() {
    let Some(ledger) = helpers::run_ledger() else {
        return;
    };

    let record = queued_record("PGR-1", 71);
    insert(&ledger, &record).await;

    let stored = ledger
        .find_by_key(record.key())
        .await
        .expect("find by key")
        .expect("record stored");
    assert_eq!(stored, record);

    let rival = queued_record("PGR-1", 72);
    let outcome = ledger
        .insert_if_absent(&rival)
        .await
        .expect("rival insert");
    match outcome {
        InsertOutcome::Existing(holder) => assert_eq!(holder, record),
        InsertOutcome::Inserted => panic!("rival stole an occupied key"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn poll_observations_apply_by_recency() {
    let Some(ledger) = helpers::run_ledger() else {
        return;
    };

    let record = queued_record("PGR-2", 73);
    insert(&ledger, &record).await;

    let fresh = ledger
        .record_poll(record.id(), &observation(2, "in_progress", None))
        .await
        .expect("apply poll");
    let updated = match fresh {
        PollApplied::Applied(applied) => applied,
        PollApplied::Stale(stale) => panic!("fresh observation refused on {stale:?}"),
    };
    assert_eq!(updated.status(), RunStatus::Running);
    assert_eq!(updated.last_polled_at(), Some(at(2)));
    assert_eq!(updated.raw(), Some(&RawRunSnapshot::new("in_progress", None)));

    let older = ledger
        .record_poll(record.id(), &observation(1, "queued", None))
        .await
        .expect("apply stale poll");
    let untouched = match older {
        PollApplied::Stale(stale) => stale,
        PollApplied::Applied(applied) => panic!("stale observation applied to {applied:?}"),
    };
    assert_eq!(untouched.status(), RunStatus::Running);
    assert_eq!(untouched.last_polled_at(), Some(at(2)));
}

#[tokio::test(flavor = "multi_thread")]
async fn a_terminal_status_is_never_overwritten() {
    let Some(ledger) = helpers::run_ledger() else {
        return;
    };

    let record = queued_record("PGR-3", 74);
    insert(&ledger, &record).await;

    let terminal = ledger
        .record_poll(record.id(), &observation(1, "completed", Some("success")))
        .await
        .expect("apply terminal poll");
    let completed = match terminal {
        PollApplied::Applied(applied) => applied,
        PollApplied::Stale(stale) => panic!("terminal observation refused on {stale:?}"),
    };
    assert_eq!(completed.status(), RunStatus::Succeeded);
    assert_eq!(completed.completed_at(), Some(at(1)));

    let late = ledger
        .record_poll(record.id(), &observation(2, "in_progress", None))
        .await
        .expect("apply late poll");
    let frozen = match late {
        PollApplied::Stale(stale) => stale,
        PollApplied::Applied(applied) => panic!("terminal record reopened as {applied:?}"),
    };
    assert_eq!(frozen.status(), RunStatus::Succeeded);
}

#[tokio::test(flavor = "multi_thread")]
async fn polling_a_missing_record_reports_not_found() {
    let Some(ledger) = helpers::run_ledger() else {
        return;
    };

    let missing = RunRecordId::new();
    let error = ledger
        .record_poll(missing, &observation(1, "queued", None))
        .await
        .expect_err("missing record polled");
    match error {
        RunLedgerError::NotFound(id) => assert_eq!(id, missing),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn the_first_ingest_payload_wins() {
    let Some(ledger) = helpers::run_ledger() else {
        return;
    };

    let record = queued_record("PGR-4", 75);
    insert(&ledger, &record).await;

    let payload = sample_payload("https://ci.example/logs/75");
    let first = ledger
        .store_ingested(record.id(), &payload, at(3))
        .await
        .expect("store payload");
    let frozen = match first {
        IngestStored::Stored(stored) => stored,
        IngestStored::AlreadyIngested(existing) => {
            panic!("payload already attached: {existing:?}")
        }
    };
    assert_eq!(frozen.ingested(), Some(&payload));
    assert_eq!(frozen.updated_at(), at(3));

    let rival = sample_payload("https://ci.example/logs/75-rerun");
    let second = ledger
        .store_ingested(record.id(), &rival, at(4))
        .await
        .expect("store rival payload");
    match second {
        IngestStored::AlreadyIngested(existing) => assert_eq!(existing, payload),
        IngestStored::Stored(stored) => panic!("second payload overwrote {stored:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn a_failed_start_is_superseded_by_a_fresh_dispatch() {
    let Some(ledger) = helpers::run_ledger() else {
        return;
    };

    let failed = failed_start_record("PGR-5");
    insert(&ledger, &failed).await;

    let replacement = queued_record("PGR-5", 76);
    let outcome = ledger
        .supersede_failed_start(failed.id(), &replacement)
        .await
        .expect("supersede failed start");
    assert_eq!(outcome, InsertOutcome::Inserted);

    let stored = ledger
        .find_by_key(replacement.key())
        .await
        .expect("find by key")
        .expect("replacement stored");
    assert_eq!(stored, replacement);

    // The replacement is live, so a later supersession attempt must
    // yield to it rather than replace it.
    let late = queued_record("PGR-5", 77);
    let refused = ledger
        .supersede_failed_start(failed.id(), &late)
        .await
        .expect("late supersession");
    match refused {
        InsertOutcome::Existing(holder) => assert_eq!(holder.id(), replacement.id()),
        InsertOutcome::Inserted => panic!("live record superseded"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn a_rejected_replacement_leaves_the_failed_start_in_place() {
    let Some(ledger) = helpers::run_ledger() else {
        return;
    };

    let failed = failed_start_record("PGR-9");
    insert(&ledger, &failed).await;
    let bystander = queued_record("PGR-10", 82);
    insert(&ledger, &bystander).await;

    // The replacement reuses the bystander's primary key, so its insert
    // is rejected after the failed-start delete; the delete must roll
    // back with it.
    let replacement = queued_record_with_id(bystander.id(), "PGR-9", 83);
    let result = ledger
        .supersede_failed_start(failed.id(), &replacement)
        .await;
    assert!(matches!(result, Err(RunLedgerError::Persistence(_))));

    let stored = ledger
        .find_by_key(failed.key())
        .await
        .expect("find by key")
        .expect("failed start still holds the key");
    assert_eq!(stored, failed);
}

#[tokio::test(flavor = "multi_thread")]
async fn superseding_a_vacant_key_inserts_the_replacement() {
    let Some(ledger) = helpers::run_ledger() else {
        return;
    };

    let replacement = queued_record("PGR-6", 78);
    let outcome = ledger
        .supersede_failed_start(RunRecordId::new(), &replacement)
        .await
        .expect("supersede vacant key");
    assert_eq!(outcome, InsertOutcome::Inserted);

    let stored = ledger
        .find_by_key(replacement.key())
        .await
        .expect("find by key")
        .expect("replacement stored");
    assert_eq!(stored, replacement);
}

#[tokio::test(flavor = "multi_thread")]
async fn external_run_lookup_is_scoped_to_the_repository() {
    let Some(ledger) = helpers::run_ledger() else {
        return;
    };

    let record = queued_record("PGR-7", 79);
    insert(&ledger, &record).await;

    let run_id = ExternalRunId::new(79).expect("valid run id");
    let found = ledger
        .find_by_external_run_id(&repo(), run_id)
        .await
        .expect("find by external run id");
    assert_eq!(found.map(|stored| stored.id()), Some(record.id()));

    let elsewhere = RepoCoords::new("octo", "gadgets").expect("valid repo coords");
    let scoped = ledger
        .find_by_external_run_id(&elsewhere, run_id)
        .await
        .expect("find in the wrong repository");
    assert!(scoped.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn correlation_listing_orders_newest_dispatch_first() {
    let Some(ledger) = helpers::run_ledger() else {
        return;
    };

    let early = RunRecord::from_persisted(PersistedRunRecordData {
        id: RunRecordId::new(),
        key: run_key("PGR-8", "fabricate-alpha.yml"),
        repo: repo(),
        git_ref: "main".to_owned(),
        external_run_id: Some(ExternalRunId::new(80).expect("valid run id")),
        run_url: None,
        status: RunStatus::Queued,
        raw: None,
        dispatched_at: at(1),
        last_polled_at: None,
        completed_at: None,
        ingested: None,
        created_at: at(1),
        updated_at: at(1),
    });
    let late = RunRecord::from_persisted(PersistedRunRecordData {
        id: RunRecordId::new(),
        key: run_key("PGR-8", "fabricate-beta.yml"),
        repo: repo(),
        git_ref: "main".to_owned(),
        external_run_id: Some(ExternalRunId::new(81).expect("valid run id")),
        run_url: None,
        status: RunStatus::Queued,
        raw: None,
        dispatched_at: at(2),
        last_polled_at: None,
        completed_at: None,
        ingested: None,
        created_at: at(2),
        updated_at: at(2),
    });
    insert(&ledger, &early).await;
    insert(&ledger, &late).await;

    let correlation = CorrelationKey::new("PGR-8").expect("valid correlation key");
    let records = ledger
        .find_by_correlation(&correlation)
        .await
        .expect("find by correlation");
    let ids: Vec<_> = records.iter().map(RunRecord::id).collect();
    assert_eq!(ids, vec![late.id(), early.id()]);
}
