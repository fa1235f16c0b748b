//! `pitwall-report`: status reports from an ingest worker to the job ledger.
//!
//! ```bash
//! pitwall-report running [--log-url <URL>]
//! pitwall-report progress --session Q --percent 40
//! pitwall-report success
//! pitwall-report failed --error "timing feed unavailable"
//! ```
//!
//! `JOB_ID` and `DATABASE_URL` are read from the environment the launcher
//! sets for the worker, or passed explicitly.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pitwall_core::types::DbId;
use pitwall_db::ledger::PgLedger;
use pitwall_worker::{ci_log_url, WorkerReporter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Report ingest job status to the ledger
#[derive(Parser, Debug)]
#[command(name = "pitwall-report")]
#[command(about = "Report ingest job status to the Pitwall job ledger")]
#[command(version)]
struct Args {
    /// Job to report on
    #[arg(long, env = "JOB_ID")]
    job_id: DbId,

    /// Ledger connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mark the job RUNNING
    Running {
        /// Link to the run log. Derived from GitHub Actions variables when omitted.
        #[arg(long)]
        log_url: Option<String>,
    },
    /// Record progress for one session
    Progress {
        /// Session code, e.g. Q or FP1
        #[arg(long)]
        session: String,
        /// Completion percentage, 0-100
        #[arg(long)]
        percent: i64,
    },
    /// Mark the job SUCCESS after all sessions are written
    Success,
    /// Mark the job FAILED
    Failed {
        /// Diagnostic message stored on the job
        #[arg(long, default_value = "")]
        error: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pitwall_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let pool = pitwall_db::create_pool(&args.database_url)
        .await
        .context("Failed to connect to the job ledger")?;
    let reporter = WorkerReporter::new(Arc::new(PgLedger::new(pool)), args.job_id);

    match args.command {
        Command::Running { log_url } => {
            let log_url = log_url.or_else(|| ci_log_url(|key| std::env::var(key).ok()));
            reporter.running(log_url.as_deref()).await?;
        }
        Command::Progress { session, percent } => {
            reporter.progress(&session, percent).await?;
        }
        Command::Success => {
            reporter.success().await?;
        }
        Command::Failed { error } => {
            reporter.failed(&error).await?;
        }
    }

    Ok(())
}
