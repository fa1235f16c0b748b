//! Liveness and ledger reachability.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    /// `ok`, or `degraded` when the ledger cannot be reached.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
}

impl Health {
    fn from_ledger(db_healthy: bool) -> Self {
        Self {
            status: if db_healthy { "ok" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            db_healthy,
        }
    }
}

/// GET /health. Always 200; callers read `status`.
async fn health(State(state): State<AppState>) -> Json<Health> {
    let result = pitwall_db::health_check(&state.pool).await;
    if let Err(e) = &result {
        tracing::warn!(error = %e, "Ledger health check failed");
    }
    Json(Health::from_ledger(result.is_ok()))
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
