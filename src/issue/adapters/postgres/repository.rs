//! `PostgreSQL` repository implementation for issue lifecycle storage.

use super::{
    models::{IssueRow, NewIssueRow},
    schema::issues,
};
use crate::issue::{
    domain::{CanonicalId, Issue, IssueId, IssueState, MirrorRef, PersistedIssueData},
    ports::{IssueRepository, IssueRepositoryError, IssueRepositoryResult, UpdateOutcome},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by issue adapters.
pub type IssuePgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed issue repository.
#[derive(Debug, Clone)]
pub struct PostgresIssueRepository {
    pool: IssuePgPool,
}

impl PostgresIssueRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: IssuePgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> IssueRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> IssueRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(IssueRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(IssueRepositoryError::persistence)?
    }
}

#[async_trait]
impl IssueRepository for PostgresIssueRepository {
    async fn store(&self, issue: &Issue) -> IssueRepositoryResult<()> {
        let issue_id = issue.id();
        let canonical_id = issue.canonical_id().clone();
        let new_row = to_new_row(issue)?;

        self.run_blocking(move |connection| {
            // The pre-check improves semantic error reporting but is not
            // relied on for correctness: the unique index still enforces
            // integrity in the TOCTOU window between check and insert.
            let duplicate = find_row_by_canonical_id(connection, &canonical_id)?;
            if duplicate.is_some() {
                return Err(IssueRepositoryError::DuplicateCanonicalId(
                    canonical_id.clone(),
                ));
            }

            diesel::insert_into(issues::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if is_canonical_id_unique_violation(info.as_ref()) =>
                    {
                        IssueRepositoryError::DuplicateCanonicalId(canonical_id.clone())
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        IssueRepositoryError::DuplicateIssue(issue_id)
                    }
                    _ => IssueRepositoryError::persistence(err),
                })?;

            Ok(())
        })
        .await
    }

    async fn update(&self, issue: &Issue) -> IssueRepositoryResult<UpdateOutcome> {
        let issue_id = issue.id();
        let guard_version = to_persisted_version(issue.version())?;
        let next_version = to_persisted_version(issue.version() + 1)?;
        let mirror = issue
            .mirror()
            .map(serde_json::to_value)
            .transpose()
            .map_err(IssueRepositoryError::persistence)?;
        let state = issue.state().as_str().to_owned();
        let updated_at = issue.updated_at();

        self.run_blocking(move |connection| {
            let affected = diesel::update(
                issues::table
                    .filter(issues::id.eq(issue_id.into_inner()))
                    .filter(issues::version.eq(guard_version)),
            )
            .set((
                issues::state.eq(state.as_str()),
                issues::mirror.eq(mirror.clone()),
                issues::version.eq(next_version),
                issues::updated_at.eq(updated_at),
            ))
            .execute(connection)
            .map_err(IssueRepositoryError::persistence)?;

            if affected == 0 {
                // Zero rows means either a version conflict or a missing
                // record; a re-read distinguishes the two.
                let current = find_row_by_id(connection, issue_id)?
                    .ok_or(IssueRepositoryError::NotFound(issue_id))?;
                return Ok(UpdateOutcome::Conflict(row_to_issue(current)?));
            }

            let stored = find_row_by_id(connection, issue_id)?
                .ok_or(IssueRepositoryError::NotFound(issue_id))?;
            Ok(UpdateOutcome::Updated(row_to_issue(stored)?))
        })
        .await
    }

    async fn find_by_id(&self, id: IssueId) -> IssueRepositoryResult<Option<Issue>> {
        self.run_blocking(move |connection| {
            let row = find_row_by_id(connection, id)?;
            row.map(row_to_issue).transpose()
        })
        .await
    }

    async fn find_by_canonical_id(
        &self,
        canonical_id: &CanonicalId,
    ) -> IssueRepositoryResult<Option<Issue>> {
        let lookup = canonical_id.clone();
        self.run_blocking(move |connection| {
            let row = find_row_by_canonical_id(connection, &lookup)?;
            row.map(row_to_issue).transpose()
        })
        .await
    }
}

fn to_persisted_version(version: u64) -> IssueRepositoryResult<i64> {
    i64::try_from(version).map_err(IssueRepositoryError::persistence)
}

fn to_new_row(issue: &Issue) -> IssueRepositoryResult<NewIssueRow> {
    let mirror = issue
        .mirror()
        .map(serde_json::to_value)
        .transpose()
        .map_err(IssueRepositoryError::persistence)?;

    Ok(NewIssueRow {
        id: issue.id().into_inner(),
        canonical_id: issue.canonical_id().as_str().to_owned(),
        state: issue.state().as_str().to_owned(),
        mirror,
        version: to_persisted_version(issue.version())?,
        created_at: issue.created_at(),
        updated_at: issue.updated_at(),
    })
}

fn row_to_issue(row: IssueRow) -> IssueRepositoryResult<Issue> {
    let IssueRow {
        id,
        canonical_id: persisted_canonical_id,
        state: persisted_state,
        mirror: persisted_mirror,
        version: persisted_version,
        created_at,
        updated_at,
    } = row;

    let canonical_id =
        CanonicalId::new(persisted_canonical_id).map_err(IssueRepositoryError::persistence)?;
    let state = IssueState::try_from(persisted_state.as_str())
        .map_err(IssueRepositoryError::persistence)?;
    let mirror = persisted_mirror
        .map(serde_json::from_value::<MirrorRef>)
        .transpose()
        .map_err(IssueRepositoryError::persistence)?;
    let version = u64::try_from(persisted_version).map_err(IssueRepositoryError::persistence)?;

    Ok(Issue::from_persisted(PersistedIssueData {
        id: IssueId::from_uuid(id),
        canonical_id,
        state,
        mirror,
        version,
        created_at,
        updated_at,
    }))
}

fn is_canonical_id_unique_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == "idx_issues_canonical_id_unique")
}

fn find_row_by_id(
    connection: &mut PgConnection,
    id: IssueId,
) -> IssueRepositoryResult<Option<IssueRow>> {
    issues::table
        .filter(issues::id.eq(id.into_inner()))
        .select(IssueRow::as_select())
        .first::<IssueRow>(connection)
        .optional()
        .map_err(IssueRepositoryError::persistence)
}

fn find_row_by_canonical_id(
    connection: &mut PgConnection,
    canonical_id: &CanonicalId,
) -> IssueRepositoryResult<Option<IssueRow>> {
    issues::table
        .filter(issues::canonical_id.eq(canonical_id.as_str()))
        .select(IssueRow::as_select())
        .first::<IssueRow>(connection)
        .optional()
        .map_err(IssueRepositoryError::persistence)
}
