//! Ingest job model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use pitwall_core::ingest::IngestStatus;
use pitwall_core::progress::ProgressMap;
use pitwall_core::types::{DbId, Timestamp};

/// A row from the `ingest_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IngestJob {
    pub id: DbId,
    pub season: i32,
    pub round: i32,
    pub requested_codes: Vec<String>,
    #[sqlx(try_from = "String")]
    pub status: IngestStatus,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub error: Option<String>,
    pub progress: Option<Json<ProgressMap>>,
    pub log_url: Option<String>,
}

impl IngestJob {
    /// Measured progress, if the worker has reported any.
    pub fn progress_map(&self) -> Option<&ProgressMap> {
        self.progress.as_ref().map(|p| &p.0)
    }
}

/// Query parameters for `GET /api/v1/ingest/jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct IngestJobListQuery {
    /// Maximum number of results. Defaults to 20, capped at 100.
    pub limit: Option<i64>,
}
