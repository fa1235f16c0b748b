//! Postgres access for the ingest orchestrator.
//!
//! - [`models`] -- row structs.
//! - [`repositories`] -- SQL for the `ingest_jobs`, `weekends`, and `sessions` tables.
//! - [`ledger`] -- the `JobLedger` / `SessionCatalog` seams used by the API,
//!   with Postgres and in-memory implementations.

use sqlx::postgres::PgPoolOptions;

pub mod ledger;
pub mod memory;
pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
