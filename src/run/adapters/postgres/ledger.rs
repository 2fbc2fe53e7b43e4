//! `PostgreSQL` ledger implementation for run dispatch records.

use super::{
    models::{NewRunRecordRow, RunRecordRow},
    schema::run_records,
};
use crate::issue::domain::RepoCoords;
use crate::run::{
    domain::{
        CorrelationKey, ExternalRunId, IngestedResult, PersistedRunRecordData, PollObservation,
        RawRunSnapshot, RunKey, RunRecord, RunRecordId, RunStatus, WorkflowId,
    },
    ports::{IngestStored, InsertOutcome, PollApplied, RunLedger, RunLedgerError, RunLedgerResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

/// `PostgreSQL` connection pool type used by run adapters.
pub type RunPgPool = Pool<ConnectionManager<PgConnection>>;

const TERMINAL_STATUSES: [&str; 3] = [
    RunStatus::Succeeded.as_str(),
    RunStatus::Failed.as_str(),
    RunStatus::Cancelled.as_str(),
];

/// `PostgreSQL`-backed run ledger.
///
/// Uniqueness and recency rules are enforced by guarded single
/// statements (`ON CONFLICT DO NOTHING` inserts and predicated updates);
/// supersession runs its delete-then-insert pair in one transaction. No
/// database lock is ever held across a caller's external call.
#[derive(Debug, Clone)]
pub struct PostgresRunLedger {
    pool: RunPgPool,
}

impl PostgresRunLedger {
    /// Creates a new ledger from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: RunPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> RunLedgerResult<T>
    where
        F: FnOnce(&mut PgConnection) -> RunLedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(RunLedgerError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(RunLedgerError::persistence)?
    }
}

#[async_trait]
impl RunLedger for PostgresRunLedger {
    async fn insert_if_absent(&self, record: &RunRecord) -> RunLedgerResult<InsertOutcome> {
        let new_row = to_new_row(record)?;
        let key = record.key().clone();

        self.run_blocking(move |connection| insert_if_absent_sync(connection, &new_row, &key))
            .await
    }

    async fn supersede_failed_start(
        &self,
        predecessor: RunRecordId,
        replacement: &RunRecord,
    ) -> RunLedgerResult<InsertOutcome> {
        let new_row = to_new_row(replacement)?;
        let key = replacement.key().clone();

        self.run_blocking(move |connection| {
            // The delete and the insert commit or roll back together, so
            // the key never goes vacant with the audit record gone. The
            // delete carries the full failed-start predicate, so a record
            // that was concurrently superseded or has left the
            // failed-start shape is simply not removed and the insert
            // below reports the surviving record.
            connection.transaction::<_, RunLedgerError, _>(|tx_conn| {
                diesel::delete(
                    run_records::table
                        .filter(run_records::id.eq(predecessor.into_inner()))
                        .filter(run_records::status.eq(RunStatus::Failed.as_str()))
                        .filter(run_records::external_run_id.is_null())
                        .filter(run_records::correlation_key.eq(key.correlation_key().as_str()))
                        .filter(run_records::workflow_id.eq(key.workflow_id().as_str())),
                )
                .execute(tx_conn)
                .map_err(RunLedgerError::persistence)?;

                insert_if_absent_sync(tx_conn, &new_row, &key)
            })
        })
        .await
    }

    async fn find_by_key(&self, key: &RunKey) -> RunLedgerResult<Option<RunRecord>> {
        let lookup = key.clone();
        self.run_blocking(move |connection| {
            let row = find_row_by_key(connection, &lookup)?;
            row.map(row_to_record).transpose()
        })
        .await
    }

    async fn find_by_external_run_id(
        &self,
        repo: &RepoCoords,
        run_id: ExternalRunId,
    ) -> RunLedgerResult<Option<RunRecord>> {
        let lookup = repo.clone();
        let persisted_run_id = to_persisted_run_id(run_id)?;
        self.run_blocking(move |connection| {
            let row = run_records::table
                .filter(run_records::repo_owner.eq(lookup.owner()))
                .filter(run_records::repo_name.eq(lookup.name()))
                .filter(run_records::external_run_id.eq(Some(persisted_run_id)))
                .select(RunRecordRow::as_select())
                .first::<RunRecordRow>(connection)
                .optional()
                .map_err(RunLedgerError::persistence)?;
            row.map(row_to_record).transpose()
        })
        .await
    }

    async fn find_by_correlation(
        &self,
        correlation_key: &CorrelationKey,
    ) -> RunLedgerResult<Vec<RunRecord>> {
        let lookup = correlation_key.clone();
        self.run_blocking(move |connection| {
            let rows = run_records::table
                .filter(run_records::correlation_key.eq(lookup.as_str()))
                .order(run_records::dispatched_at.desc())
                .select(RunRecordRow::as_select())
                .load::<RunRecordRow>(connection)
                .map_err(RunLedgerError::persistence)?;
            rows.into_iter().map(row_to_record).collect()
        })
        .await
    }

    async fn record_poll(
        &self,
        id: RunRecordId,
        observation: &PollObservation,
    ) -> RunLedgerResult<PollApplied> {
        let observed_at = observation.observed_at;
        let status = observation.status.as_str();
        let raw_status = observation.raw.status.clone();
        let raw_conclusion = observation.raw.conclusion.clone();
        let run_url = observation.run_url.clone();
        // A record passing the non-terminal guard has never completed, so
        // its completion timestamp is computed here rather than coalesced
        // in SQL.
        let completed_at = observation
            .status
            .is_terminal()
            .then_some(observed_at);

        self.run_blocking(move |connection| {
            let common = (
                run_records::status.eq(status),
                run_records::raw_status.eq(Some(raw_status)),
                run_records::raw_conclusion.eq(raw_conclusion),
                run_records::last_polled_at.eq(Some(observed_at)),
                run_records::completed_at.eq(completed_at),
                run_records::updated_at.eq(observed_at),
            );
            let guarded = run_records::table
                .filter(run_records::id.eq(id.into_inner()))
                .filter(run_records::status.ne_all(TERMINAL_STATUSES.to_vec()))
                .filter(
                    run_records::last_polled_at
                        .is_null()
                        .or(run_records::last_polled_at.le(observed_at)),
                );

            let affected = match run_url {
                Some(url) => diesel::update(guarded)
                    .set((common, run_records::run_url.eq(Some(url))))
                    .execute(connection),
                None => diesel::update(guarded).set(common).execute(connection),
            }
            .map_err(RunLedgerError::persistence)?;

            let stored =
                find_row_by_id(connection, id)?.ok_or(RunLedgerError::NotFound(id))?;
            let record = row_to_record(stored)?;
            if affected == 0 {
                Ok(PollApplied::Stale(record))
            } else {
                Ok(PollApplied::Applied(record))
            }
        })
        .await
    }

    async fn store_ingested(
        &self,
        id: RunRecordId,
        result: &IngestedResult,
        ingested_at: DateTime<Utc>,
    ) -> RunLedgerResult<IngestStored> {
        let payload = serde_json::to_value(result).map_err(RunLedgerError::persistence)?;

        self.run_blocking(move |connection| {
            let affected = diesel::update(
                run_records::table
                    .filter(run_records::id.eq(id.into_inner()))
                    .filter(run_records::ingested.is_null()),
            )
            .set((
                run_records::ingested.eq(Some(payload)),
                run_records::updated_at.eq(ingested_at),
            ))
            .execute(connection)
            .map_err(RunLedgerError::persistence)?;

            let stored =
                find_row_by_id(connection, id)?.ok_or(RunLedgerError::NotFound(id))?;
            let record = row_to_record(stored)?;
            if affected == 0 {
                let existing = record.ingested().cloned().ok_or_else(|| {
                    RunLedgerError::persistence(std::io::Error::other(
                        "ingest guard matched no rows yet none is stored",
                    ))
                })?;
                return Ok(IngestStored::AlreadyIngested(existing));
            }
            Ok(IngestStored::Stored(record))
        })
        .await
    }
}

impl From<diesel::result::Error> for RunLedgerError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}

fn insert_if_absent_sync(
    connection: &mut PgConnection,
    new_row: &NewRunRecordRow,
    key: &RunKey,
) -> RunLedgerResult<InsertOutcome> {
    // A conflicting record can be deleted by a concurrent supersession
    // between the insert and the re-read, so one further attempt covers
    // that window.
    for _ in 0..2 {
        let inserted = diesel::insert_into(run_records::table)
            .values(new_row)
            .on_conflict((run_records::correlation_key, run_records::workflow_id))
            .do_nothing()
            .execute(connection)
            .map_err(RunLedgerError::persistence)?;
        if inserted > 0 {
            return Ok(InsertOutcome::Inserted);
        }
        if let Some(existing) = find_row_by_key(connection, key)? {
            return Ok(InsertOutcome::Existing(row_to_record(existing)?));
        }
    }
    Err(RunLedgerError::persistence(std::io::Error::other(
        "run key conflict with no visible record",
    )))
}

fn to_persisted_run_id(run_id: ExternalRunId) -> RunLedgerResult<i64> {
    i64::try_from(run_id.value()).map_err(RunLedgerError::persistence)
}

fn to_new_row(record: &RunRecord) -> RunLedgerResult<NewRunRecordRow> {
    let external_run_id = record
        .external_run_id()
        .map(to_persisted_run_id)
        .transpose()?;
    let ingested = record
        .ingested()
        .map(serde_json::to_value)
        .transpose()
        .map_err(RunLedgerError::persistence)?;

    Ok(NewRunRecordRow {
        id: record.id().into_inner(),
        correlation_key: record.correlation_key().as_str().to_owned(),
        workflow_id: record.key().workflow_id().as_str().to_owned(),
        repo_owner: record.repo().owner().to_owned(),
        repo_name: record.repo().name().to_owned(),
        git_ref: record.git_ref().to_owned(),
        external_run_id,
        run_url: record.run_url().map(str::to_owned),
        status: record.status().as_str().to_owned(),
        raw_status: record.raw().map(|raw| raw.status.clone()),
        raw_conclusion: record.raw().and_then(|raw| raw.conclusion.clone()),
        dispatched_at: record.dispatched_at(),
        last_polled_at: record.last_polled_at(),
        completed_at: record.completed_at(),
        ingested,
        created_at: record.created_at(),
        updated_at: record.updated_at(),
    })
}

fn row_to_record(row: RunRecordRow) -> RunLedgerResult<RunRecord> {
    let RunRecordRow {
        id,
        correlation_key: persisted_correlation_key,
        workflow_id: persisted_workflow_id,
        repo_owner,
        repo_name,
        git_ref,
        external_run_id: persisted_external_run_id,
        run_url,
        status: persisted_status,
        raw_status,
        raw_conclusion,
        dispatched_at,
        last_polled_at,
        completed_at,
        ingested: persisted_ingested,
        created_at,
        updated_at,
    } = row;

    let correlation_key =
        CorrelationKey::new(persisted_correlation_key).map_err(RunLedgerError::persistence)?;
    let workflow_id = WorkflowId::new(persisted_workflow_id).map_err(RunLedgerError::persistence)?;
    let repo = RepoCoords::new(repo_owner, repo_name).map_err(RunLedgerError::persistence)?;
    let external_run_id = persisted_external_run_id
        .map(|stored| {
            u64::try_from(stored)
                .map_err(RunLedgerError::persistence)
                .and_then(|value| ExternalRunId::new(value).map_err(RunLedgerError::persistence))
        })
        .transpose()?;
    let status =
        RunStatus::try_from(persisted_status.as_str()).map_err(RunLedgerError::persistence)?;
    let raw = raw_status.map(|raw| RawRunSnapshot::new(raw, raw_conclusion));
    let ingested = persisted_ingested
        .map(serde_json::from_value::<IngestedResult>)
        .transpose()
        .map_err(RunLedgerError::persistence)?;

    Ok(RunRecord::from_persisted(PersistedRunRecordData {
        id: RunRecordId::from_uuid(id),
        key: RunKey::new(correlation_key, workflow_id),
        repo,
        git_ref,
        external_run_id,
        run_url,
        status,
        raw,
        dispatched_at,
        last_polled_at,
        completed_at,
        ingested,
        created_at,
        updated_at,
    }))
}

fn find_row_by_id(
    connection: &mut PgConnection,
    id: RunRecordId,
) -> RunLedgerResult<Option<RunRecordRow>> {
    run_records::table
        .filter(run_records::id.eq(id.into_inner()))
        .select(RunRecordRow::as_select())
        .first::<RunRecordRow>(connection)
        .optional()
        .map_err(RunLedgerError::persistence)
}

fn find_row_by_key(
    connection: &mut PgConnection,
    key: &RunKey,
) -> RunLedgerResult<Option<RunRecordRow>> {
    run_records::table
        .filter(run_records::correlation_key.eq(key.correlation_key().as_str()))
        .filter(run_records::workflow_id.eq(key.workflow_id().as_str()))
        .select(RunRecordRow::as_select())
        .first::<RunRecordRow>(connection)
        .optional()
        .map_err(RunLedgerError::persistence)
}
