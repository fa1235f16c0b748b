//! Repository for the `ingest_jobs` table.
//!
//! Every state change is a single-row `UPDATE ... WHERE id = $1` guarded on
//! the row not being terminal, so `SUCCESS`/`FAILED` are never overwritten.
//! The boolean returned by each mutation says whether the row changed.

use sqlx::PgPool;
use pitwall_core::ingest::IngestStatus;
use pitwall_core::types::DbId;

use crate::models::ingest_job::IngestJob;

/// Column list for `ingest_jobs` queries.
const COLUMNS: &str = "\
    id, season, round, requested_codes, status, \
    created_at, started_at, finished_at, error, progress, log_url";

/// Maximum page size for job listing.
pub const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
pub const DEFAULT_LIMIT: i64 = 20;

/// Clamp a requested page size into `1..=MAX_LIMIT`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Provides persistence for ingest jobs.
pub struct IngestJobRepo;

impl IngestJobRepo {
    /// Insert a new `QUEUED` job and return the created row.
    pub async fn create(
        pool: &PgPool,
        season: i32,
        round: i32,
        requested_codes: &[String],
    ) -> Result<IngestJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO ingest_jobs (season, round, requested_codes, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IngestJob>(&query)
            .bind(season)
            .bind(round)
            .bind(requested_codes)
            .bind(IngestStatus::Queued.as_str())
            .fetch_one(pool)
            .await
    }

    /// Move a non-terminal job to `RUNNING`.
    ///
    /// `started_at` keeps its first value when both the launcher and the
    /// worker report it.
    pub async fn mark_running(
        pool: &PgPool,
        id: DbId,
        log_url: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ingest_jobs \
             SET status = $2, started_at = COALESCE(started_at, NOW()), \
                 log_url = COALESCE($3, log_url) \
             WHERE id = $1 AND status NOT IN ($4, $5)",
        )
        .bind(id)
        .bind(IngestStatus::Running.as_str())
        .bind(log_url)
        .bind(IngestStatus::Success.as_str())
        .bind(IngestStatus::Failed.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a non-terminal job as failed. No automatic retry is performed.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ingest_jobs \
             SET status = $2, error = $3, finished_at = NOW() \
             WHERE id = $1 AND status NOT IN ($4, $5)",
        )
        .bind(id)
        .bind(IngestStatus::Failed.as_str())
        .bind(error)
        .bind(IngestStatus::Success.as_str())
        .bind(IngestStatus::Failed.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a non-terminal job as succeeded.
    ///
    /// If any progress was reported, every requested code is set to 100.
    pub async fn mark_success(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ingest_jobs \
             SET status = $2, finished_at = NOW(), \
                 progress = CASE WHEN progress IS NULL THEN NULL ELSE progress || ( \
                     SELECT jsonb_object_agg(code, 100) FROM unnest(requested_codes) AS code \
                 ) END \
             WHERE id = $1 AND status NOT IN ($2, $3)",
        )
        .bind(id)
        .bind(IngestStatus::Success.as_str())
        .bind(IngestStatus::Failed.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Merge one session's percentage into the sparse progress map.
    pub async fn record_progress(
        pool: &PgPool,
        id: DbId,
        session_code: &str,
        percent: u8,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ingest_jobs \
             SET progress = COALESCE(progress, '{}'::jsonb) || jsonb_build_object($2::TEXT, $3::INTEGER) \
             WHERE id = $1 AND status NOT IN ($4, $5)",
        )
        .bind(id)
        .bind(session_code)
        .bind(i32::from(percent))
        .bind(IngestStatus::Success.as_str())
        .bind(IngestStatus::Failed.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<IngestJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM ingest_jobs WHERE id = $1");
        sqlx::query_as::<_, IngestJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent jobs first.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<IngestJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ingest_jobs \
             ORDER BY created_at DESC, id DESC \
             LIMIT $1"
        );
        sqlx::query_as::<_, IngestJob>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
