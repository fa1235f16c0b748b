//! Route definitions for the `/ingest` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::ingest;
use crate::state::AppState;

/// Routes mounted at `/ingest`.
///
/// ```text
/// POST   /             -> trigger_ingest (auth)
/// GET    /status       -> ingest_status
/// GET    /jobs         -> list_jobs
/// GET    /jobs/{id}    -> get_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(ingest::trigger_ingest))
        .route("/status", get(ingest::ingest_status))
        .route("/jobs", get(ingest::list_jobs))
        .route("/jobs/{id}", get(ingest::get_job))
}
