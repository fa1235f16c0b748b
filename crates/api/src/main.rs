use std::net::SocketAddr;
use std::sync::Arc;

use pitwall_api::config::{ServerConfig, WorkerConfig};
use pitwall_api::ingest::IngestService;
use pitwall_api::routes;
use pitwall_api::state::AppState;
use pitwall_core::worker::resolver::SystemProbe;
use pitwall_db::ledger::{PgLedger, PgSessionCatalog};
use pitwall_db::DbPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pitwall_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let worker = WorkerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        worker_env_dir = %worker.resolver.env_dir.display(),
        worker_override = worker.resolver.override_path.is_some(),
        default_sessions = ?worker.default_sessions,
        "Configuration loaded",
    );

    let pool = open_ledger().await;

    let ingest = IngestService::new(
        Arc::new(PgLedger::new(pool.clone())),
        Arc::new(PgSessionCatalog::new(pool.clone())),
        Arc::new(SystemProbe),
        worker,
    );
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ingest: Arc::new(ingest),
    };
    let app = routes::build_app(state, &config);

    let host = config.host.parse().expect("HOST must be an IP address");
    let addr = SocketAddr::new(host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {addr}: {e}"));
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Spawned workers sit in their own process groups and outlive us.
    // They finish their jobs through their own ledger writes.
    tracing::info!("Server stopped; running workers left detached");
}

/// Connect, verify, and migrate the ledger database. Panics on failure.
async fn open_ledger() -> DbPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = pitwall_db::create_pool(&url)
        .await
        .expect("Failed to connect to the ledger database");
    pitwall_db::health_check(&pool)
        .await
        .expect("Ledger database health check failed");
    pitwall_db::run_migrations(&pool)
        .await
        .expect("Failed to apply ledger migrations");

    tracing::info!("Ledger database ready");
    pool
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        () = ctrl_c => "SIGINT",
        () = terminate => "SIGTERM",
    };
    tracing::info!(signal, "Shutting down");
}
