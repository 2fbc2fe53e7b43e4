//! Shared helpers for `PostgreSQL` integration tests.
//!
//! The first accessor call builds one process-wide pool from
//! `FABRICA_TEST_DATABASE_URL` and recreates the schema from the checked-in
//! migrations, so every run starts from empty tables. Tests share the
//! database afterwards and must use distinct canonical identifiers and
//! correlation keys.

use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use fabrica::issue::adapters::postgres::{IssuePgPool, PostgresIssueRepository};
use fabrica::run::adapters::postgres::PostgresRunLedger;
use once_cell::sync::Lazy;

/// Boxed error for setup fallibility.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Environment variable naming the test database.
pub const DATABASE_URL_VAR: &str = "FABRICA_TEST_DATABASE_URL";

/// SQL creating the issues table and its uniqueness index.
const CREATE_ISSUES_SQL: &str =
    include_str!("../../migrations/2026-08-05-000000_create_issues/up.sql");

/// SQL creating the run records table and its key index.
const CREATE_RUN_RECORDS_SQL: &str =
    include_str!("../../migrations/2026-08-05-000001_create_run_records/up.sql");

static POOL: Lazy<Option<IssuePgPool>> = Lazy::new(|| {
    let url = std::env::var(DATABASE_URL_VAR).ok()?;
    let manager = ConnectionManager::<PgConnection>::new(url);
    let pool = Pool::builder().max_size(2).build(manager).ok()?;
    apply_schema(&pool).ok()?;
    Some(pool)
});

fn apply_schema(pool: &IssuePgPool) -> Result<(), BoxError> {
    let mut connection = pool.get()?;
    connection.batch_execute("DROP TABLE IF EXISTS run_records; DROP TABLE IF EXISTS issues;")?;
    connection.batch_execute(CREATE_ISSUES_SQL)?;
    connection.batch_execute(CREATE_RUN_RECORDS_SQL)?;
    Ok(())
}

/// Returns an issue repository over the shared pool, or `None` when the
/// suite is not configured.
pub fn issue_repository() -> Option<PostgresIssueRepository> {
    POOL.as_ref()
        .map(|pool| PostgresIssueRepository::new(pool.clone()))
}

/// Returns a run ledger over the shared pool, or `None` when the suite
/// is not configured.
pub fn run_ledger() -> Option<PostgresRunLedger> {
    POOL.as_ref().map(|pool| PostgresRunLedger::new(pool.clone()))
}
