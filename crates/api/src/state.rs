use std::sync::Arc;

use crate::config::ServerConfig;
use crate::ingest::IngestService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (health checks).
    pub pool: pitwall_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Dedup check, job launcher, and status reporter.
    pub ingest: Arc<IngestService>,
}
