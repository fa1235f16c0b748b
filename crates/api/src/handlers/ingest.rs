//! Handlers for the `/ingest` resource.
//!
//! Triggering requires authentication via [`Caller`]. Status reads are
//! public so dashboards can poll without a token.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pitwall_core::ingest::WeekendTarget;
use pitwall_core::types::DbId;
use pitwall_db::models::ingest_job::IngestJobListQuery;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::ingest::reporter::JobSnapshot;
use crate::ingest::TriggerOutcome;
use crate::middleware::auth::Caller;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /api/v1/ingest`.
#[derive(Debug, Deserialize)]
pub struct TriggerIngest {
    pub season: Option<i32>,
    pub round: Option<i32>,
    /// Session codes to ingest. Defaults to the configured set.
    pub sessions: Option<Vec<String>>,
}

/// Query parameters for `GET /api/v1/ingest/status`.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub job_id: Option<DbId>,
    pub limit: Option<i64>,
}

/// A single job when `job_id` was given, otherwise the recent list.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StatusReply {
    Job(JobSnapshot),
    Recent(Vec<JobSnapshot>),
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// POST /api/v1/ingest
///
/// Returns 202 with `{ job_id }` when a job was created, or 200 with
/// `{ message: "already exists", existing_sessions }` when every requested
/// session is already stored.
pub async fn trigger_ingest(
    caller: Caller,
    State(state): State<AppState>,
    Json(input): Json<TriggerIngest>,
) -> AppResult<impl IntoResponse> {
    let target = WeekendTarget::from_request(input.season, input.round)?;
    let outcome = state.ingest.trigger(target, input.sessions).await?;

    let status = match &outcome {
        TriggerOutcome::Launched { job_id } => {
            tracing::info!(
                job_id = *job_id,
                season = target.season,
                round = target.round,
                caller = %caller.subject,
                role = %caller.role,
                token_id = %caller.token_id,
                "Ingest triggered",
            );
            StatusCode::ACCEPTED
        }
        TriggerOutcome::AlreadyExists { .. } => StatusCode::OK,
    };

    Ok((status, Json(DataResponse { data: outcome })))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/ingest/status?job_id=
pub async fn ingest_status(
    State(state): State<AppState>,
    Query(params): Query<StatusQuery>,
) -> AppResult<impl IntoResponse> {
    let reporter = state.ingest.reporter();
    let data = match params.job_id {
        Some(id) => StatusReply::Job(reporter.get_job(id).await?),
        None => StatusReply::Recent(reporter.list_recent(params.limit).await?),
    };
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/ingest/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<IngestJobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.ingest.reporter().list_recent(params.limit).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/ingest/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = state.ingest.reporter().get_job(job_id).await?;
    Ok(Json(DataResponse { data: job }))
}
