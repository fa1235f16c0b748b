//! Repository for the `weekends` and `sessions` tables.
//!
//! The orchestrator only reads these (the dedup check). The upserts exist
//! for the worker side and for tests; they are idempotent on the natural
//! keys so duplicate concurrent workers converge.

use sqlx::PgPool;
use pitwall_core::types::{DbId, Timestamp};

use crate::models::session::Session;

/// Provides access to weekends and their sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Session codes already stored for the given weekend.
    pub async fn existing_codes(
        pool: &PgPool,
        season: i32,
        round: i32,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT s.session_code \
             FROM sessions s \
             JOIN weekends w ON w.id = s.weekend_id \
             WHERE w.season = $1 AND w.round = $2 \
             ORDER BY s.session_code",
        )
        .bind(season)
        .bind(round)
        .fetch_all(pool)
        .await
    }

    /// Insert or update a weekend, returning its id.
    pub async fn upsert_weekend(
        pool: &PgPool,
        season: i32,
        round: i32,
        name: Option<&str>,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO weekends (season, round, name) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (season, round) DO UPDATE \
                 SET name = COALESCE(EXCLUDED.name, weekends.name) \
             RETURNING id",
        )
        .bind(season)
        .bind(round)
        .bind(name)
        .fetch_one(pool)
        .await
    }

    /// Insert or update a session under a weekend.
    pub async fn upsert_session(
        pool: &PgPool,
        weekend_id: DbId,
        session_code: &str,
        start_time_utc: Option<Timestamp>,
    ) -> Result<Session, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (weekend_id, session_code, start_time_utc) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (weekend_id, session_code) DO UPDATE \
                 SET start_time_utc = COALESCE(EXCLUDED.start_time_utc, sessions.start_time_utc) \
             RETURNING id, weekend_id, session_code, start_time_utc",
        )
        .bind(weekend_id)
        .bind(session_code)
        .bind(start_time_utc)
        .fetch_one(pool)
        .await
    }
}
