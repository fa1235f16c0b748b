use std::path::PathBuf;

use pitwall_core::progress::DEFAULT_SECS_PER_SESSION;
use pitwall_core::session_codes::{split_codes, DEFAULT_SESSION_CODES};
use pitwall_core::worker::env::ProxySettings;
use pitwall_core::worker::output::DEFAULT_TAIL_LINES;
use pitwall_core::worker::resolver::{
    ExecutableResolver, DEFAULT_ENV_DIR, DEFAULT_SYSTEM_INTERPRETERS,
};

use crate::auth::jwt::JwtConfig;

/// Default worker entrypoint, relative to the worker directory.
pub const DEFAULT_WORKER_SCRIPT: &str = "ingest/run_job.py";

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
        }
    }
}

/// How ingest workers are located, invoked, and described to clients.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Ordered executable lookup (override, bundled env, system interpreter).
    pub resolver: ExecutableResolver,
    /// Arguments passed to the resolved executable (the worker script).
    pub worker_args: Vec<String>,
    /// Working directory for the worker process.
    pub worker_dir: Option<PathBuf>,
    /// Destination connection string handed to the worker.
    pub destination_url: Option<String>,
    /// Proxy settings forwarded to the worker.
    pub proxy: ProxySettings,
    /// Directory holding each job's stdout/stderr log files.
    pub log_dir: PathBuf,
    /// Lines of stdout/stderr kept for failure diagnostics.
    pub output_tail_lines: usize,
    /// Codes ingested when a request omits `sessions`.
    pub default_sessions: Vec<String>,
    /// Assumed duration of one session, for read-side progress estimates.
    pub estimate_secs_per_session: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            resolver: ExecutableResolver::default(),
            worker_args: vec![DEFAULT_WORKER_SCRIPT.to_string()],
            worker_dir: None,
            destination_url: None,
            proxy: ProxySettings::default(),
            log_dir: default_log_dir(),
            output_tail_lines: DEFAULT_TAIL_LINES,
            default_sessions: DEFAULT_SESSION_CODES.iter().map(|s| s.to_string()).collect(),
            estimate_secs_per_session: DEFAULT_SECS_PER_SESSION,
        }
    }
}

impl WorkerConfig {
    /// Load worker configuration from environment variables.
    ///
    /// | Env Var                      | Default              |
    /// |------------------------------|----------------------|
    /// | `WORKER_EXECUTABLE`          | unset                |
    /// | `WORKER_ENV_DIR`             | `.venv`              |
    /// | `WORKER_SYSTEM_INTERPRETERS` | `python3,python`     |
    /// | `WORKER_SCRIPT`              | `ingest/run_job.py`  |
    /// | `WORKER_DIR`                 | unset                |
    /// | `WORKER_DATABASE_URL`        | `DATABASE_URL`       |
    /// | `WORKER_HTTP_PROXY`          | unset                |
    /// | `WORKER_HTTPS_PROXY`         | unset                |
    /// | `WORKER_NO_PROXY`            | unset                |
    /// | `WORKER_LOG_DIR`             | `$TMPDIR/pitwall-workers` |
    /// | `WORKER_OUTPUT_TAIL_LINES`   | `40`                 |
    /// | `INGEST_DEFAULT_SESSIONS`    | `Q,R`                |
    /// | `INGEST_SECS_PER_SESSION`    | `90`                 |
    ///
    /// When `WORKER_ENV_DIR` or `WORKER_LOG_DIR` is relative it is resolved
    /// against `WORKER_DIR`.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let worker_dir = non_empty("WORKER_DIR").map(PathBuf::from);

        let mut env_dir = PathBuf::from(
            non_empty("WORKER_ENV_DIR").unwrap_or_else(|| DEFAULT_ENV_DIR.to_string()),
        );
        if let (true, Some(dir)) = (env_dir.is_relative(), &worker_dir) {
            env_dir = dir.join(env_dir);
        }

        let mut log_dir = non_empty("WORKER_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_log_dir);
        if let (true, Some(dir)) = (log_dir.is_relative(), &worker_dir) {
            log_dir = dir.join(log_dir);
        }

        let system_interpreters = non_empty("WORKER_SYSTEM_INTERPRETERS")
            .map(|v| split_codes(&v))
            .unwrap_or_else(|| {
                DEFAULT_SYSTEM_INTERPRETERS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        let resolver = ExecutableResolver {
            override_path: non_empty("WORKER_EXECUTABLE").map(PathBuf::from),
            env_dir,
            system_interpreters,
        };

        let worker_args = vec![
            non_empty("WORKER_SCRIPT").unwrap_or_else(|| DEFAULT_WORKER_SCRIPT.to_string()),
        ];

        let output_tail_lines: usize = non_empty("WORKER_OUTPUT_TAIL_LINES")
            .unwrap_or_else(|| DEFAULT_TAIL_LINES.to_string())
            .parse()
            .expect("WORKER_OUTPUT_TAIL_LINES must be a valid usize");

        let default_sessions = non_empty("INGEST_DEFAULT_SESSIONS")
            .map(|v| split_codes(&v))
            .unwrap_or_else(|| DEFAULT_SESSION_CODES.iter().map(|s| s.to_string()).collect());

        let estimate_secs_per_session: u64 = non_empty("INGEST_SECS_PER_SESSION")
            .unwrap_or_else(|| DEFAULT_SECS_PER_SESSION.to_string())
            .parse()
            .expect("INGEST_SECS_PER_SESSION must be a valid u64");

        Self {
            resolver,
            worker_args,
            worker_dir,
            destination_url: non_empty("WORKER_DATABASE_URL").or_else(|| non_empty("DATABASE_URL")),
            proxy: ProxySettings {
                http: non_empty("WORKER_HTTP_PROXY"),
                https: non_empty("WORKER_HTTPS_PROXY"),
                no_proxy: non_empty("WORKER_NO_PROXY"),
            },
            log_dir,
            output_tail_lines,
            default_sessions,
            estimate_secs_per_session,
        }
    }
}

fn default_log_dir() -> PathBuf {
    std::env::temp_dir().join("pitwall-workers")
}
