//! Storage seams for the ingest orchestrator.
//!
//! The API holds these as `Arc<dyn JobLedger>` / `Arc<dyn SessionCatalog>`
//! so tests can swap in [`crate::memory`] implementations. Every ledger
//! mutation is a single-row write keyed by job id and returns `false` when
//! the job was already terminal (or does not exist).

use async_trait::async_trait;
use pitwall_core::ingest::WeekendTarget;
use pitwall_core::types::DbId;

use crate::models::ingest_job::IngestJob;
use crate::repositories::{IngestJobRepo, SessionRepo};
use crate::DbPool;

/// Persisted record of every ingestion attempt.
#[async_trait]
pub trait JobLedger: Send + Sync {
    /// Atomically insert a `QUEUED` job and return it with its generated id.
    async fn create(
        &self,
        target: WeekendTarget,
        requested_codes: &[String],
    ) -> Result<IngestJob, sqlx::Error>;

    /// Record that the worker is running. Sets `started_at` once.
    async fn mark_running(&self, id: DbId, log_url: Option<&str>) -> Result<bool, sqlx::Error>;

    /// Record a terminal failure with a diagnostic message.
    async fn mark_failed(&self, id: DbId, error: &str) -> Result<bool, sqlx::Error>;

    /// Record terminal success. Only the worker's own completion signal
    /// may call this; exit status alone never does.
    async fn mark_success(&self, id: DbId) -> Result<bool, sqlx::Error>;

    /// Merge a per-session percentage into the sparse progress map.
    async fn record_progress(
        &self,
        id: DbId,
        session_code: &str,
        percent: u8,
    ) -> Result<bool, sqlx::Error>;

    async fn find(&self, id: DbId) -> Result<Option<IngestJob>, sqlx::Error>;

    /// Newest jobs first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<IngestJob>, sqlx::Error>;
}

/// Read-only view of which sessions already exist in storage.
#[async_trait]
pub trait SessionCatalog: Send + Sync {
    async fn existing_codes(&self, target: WeekendTarget) -> Result<Vec<String>, sqlx::Error>;
}

// ---------------------------------------------------------------------------
// Postgres implementations
// ---------------------------------------------------------------------------

/// [`JobLedger`] backed by the `ingest_jobs` table.
#[derive(Clone)]
pub struct PgLedger {
    pool: DbPool,
}

impl PgLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobLedger for PgLedger {
    async fn create(
        &self,
        target: WeekendTarget,
        requested_codes: &[String],
    ) -> Result<IngestJob, sqlx::Error> {
        IngestJobRepo::create(&self.pool, target.season, target.round, requested_codes).await
    }

    async fn mark_running(&self, id: DbId, log_url: Option<&str>) -> Result<bool, sqlx::Error> {
        IngestJobRepo::mark_running(&self.pool, id, log_url).await
    }

    async fn mark_failed(&self, id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        IngestJobRepo::mark_failed(&self.pool, id, error).await
    }

    async fn mark_success(&self, id: DbId) -> Result<bool, sqlx::Error> {
        IngestJobRepo::mark_success(&self.pool, id).await
    }

    async fn record_progress(
        &self,
        id: DbId,
        session_code: &str,
        percent: u8,
    ) -> Result<bool, sqlx::Error> {
        IngestJobRepo::record_progress(&self.pool, id, session_code, percent).await
    }

    async fn find(&self, id: DbId) -> Result<Option<IngestJob>, sqlx::Error> {
        IngestJobRepo::find_by_id(&self.pool, id).await
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<IngestJob>, sqlx::Error> {
        IngestJobRepo::list_recent(&self.pool, limit).await
    }
}

/// [`SessionCatalog`] backed by the `weekends`/`sessions` tables.
#[derive(Clone)]
pub struct PgSessionCatalog {
    pool: DbPool,
}

impl PgSessionCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionCatalog for PgSessionCatalog {
    async fn existing_codes(&self, target: WeekendTarget) -> Result<Vec<String>, sqlx::Error> {
        SessionRepo::existing_codes(&self.pool, target.season, target.round).await
    }
}
