//! Session rows (owned by the ingest worker; read for dedup).

use serde::Serialize;
use sqlx::FromRow;
use pitwall_core::types::{DbId, Timestamp};

/// A row from the `sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Session {
    pub id: DbId,
    pub weekend_id: DbId,
    pub session_code: String,
    pub start_time_utc: Option<Timestamp>,
}
