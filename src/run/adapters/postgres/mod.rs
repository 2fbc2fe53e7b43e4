//! `PostgreSQL` persistence for the run ledger.

mod ledger;
mod models;
mod schema;

pub use ledger::{PostgresRunLedger, RunPgPool};
