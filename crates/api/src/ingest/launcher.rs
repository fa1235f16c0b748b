//! Job Launcher: ledger entry, executable resolution, detached spawn.
//!
//! `launch` returns as soon as the spawn call has succeeded or failed. The
//! child keeps running after the request (and even the server) is gone;
//! its output goes to per-job log files, and a [`supervise`] task records
//! a failure if it exits non-zero.

use std::process::Stdio;
use std::str::FromStr;
use std::sync::Arc;

use pitwall_core::ingest::WeekendTarget;
use pitwall_core::session_codes::join_codes;
use pitwall_core::types::DbId;
use pitwall_core::worker::env::WorkerJobEnv;
use pitwall_core::worker::resolver::{ExecutableProbe, ResolvedExecutable};
use pitwall_db::ledger::JobLedger;
use sqlx::postgres::PgConnectOptions;
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::supervisor::{supervise, WorkerExit, WorkerLogs};
use crate::config::WorkerConfig;

/// The destination connection string handed to the worker is unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerConfigError {
    #[error(
        "No destination connection string configured for the worker. \
         Set WORKER_DATABASE_URL or DATABASE_URL"
    )]
    MissingDestination,

    #[error("Destination connection string is malformed: {0}")]
    MalformedDestination(String),
}

/// Check that the destination URL is present and parses as a Postgres
/// connection string. The URL itself never appears in the error.
pub fn validate_destination(url: Option<&str>) -> Result<String, WorkerConfigError> {
    let url = url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(WorkerConfigError::MissingDestination)?;

    PgConnectOptions::from_str(url)
        .map_err(|e| WorkerConfigError::MalformedDestination(e.to_string()))?;

    Ok(url.to_string())
}

/// A launch that produced no job id.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The ledger row could not be created or updated.
    #[error(transparent)]
    Ledger(#[from] sqlx::Error),

    /// The launch task died before reporting back.
    #[error("Launch task ended unexpectedly: {0}")]
    Interrupted(String),
}

/// A job that has been recorded and, if everything went well, spawned.
#[derive(Debug)]
pub struct LaunchedJob {
    pub job_id: DbId,
    /// Present only when a worker process was actually started.
    pub supervisor: Option<JoinHandle<WorkerExit>>,
}

#[derive(Clone)]
pub struct JobLauncher {
    ledger: Arc<dyn JobLedger>,
    probe: Arc<dyn ExecutableProbe>,
    config: Arc<WorkerConfig>,
}

impl JobLauncher {
    pub fn new(
        ledger: Arc<dyn JobLedger>,
        probe: Arc<dyn ExecutableProbe>,
        config: Arc<WorkerConfig>,
    ) -> Self {
        Self {
            ledger,
            probe,
            config,
        }
    }

    /// Record a `QUEUED` job for `missing` and start its worker.
    ///
    /// Configuration and spawn failures are written to the job as `FAILED`
    /// and the id is still returned. Only a failure to create the ledger
    /// row is an error here.
    ///
    /// The work runs on its own task. Dropping the returned future (client
    /// gone, request timeout) does not stop it, so every created row still
    /// reaches `RUNNING` or `FAILED` and every spawned child is supervised.
    pub async fn launch(
        &self,
        target: WeekendTarget,
        missing: &[String],
    ) -> Result<LaunchedJob, LaunchError> {
        let launcher = self.clone();
        let missing = missing.to_vec();
        let task = tokio::spawn(async move { launcher.start(target, missing).await });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Launch task failed");
                Err(LaunchError::Interrupted(e.to_string()))
            }
        }
    }

    async fn start(
        &self,
        target: WeekendTarget,
        missing: Vec<String>,
    ) -> Result<LaunchedJob, LaunchError> {
        let job = self.ledger.create(target, &missing).await?;
        let job_id = job.id;
        tracing::info!(
            job_id,
            season = target.season,
            round = target.round,
            codes = %join_codes(&missing),
            "Ingest job queued",
        );

        let not_started = LaunchedJob {
            job_id,
            supervisor: None,
        };

        let destination = match validate_destination(self.config.destination_url.as_deref()) {
            Ok(url) => url,
            Err(e) => {
                self.fail_before_start(job_id, &e.to_string()).await?;
                return Ok(not_started);
            }
        };

        let executable = match self.resolve().await {
            Ok(executable) => executable,
            Err(message) => {
                self.fail_before_start(job_id, &message).await?;
                return Ok(not_started);
            }
        };

        let (logs, stdout, stderr) = match self.open_logs(job_id).await {
            Ok(opened) => opened,
            Err(e) => {
                let message = format!(
                    "Failed to open worker log in {}: {e}",
                    self.config.log_dir.display()
                );
                self.fail_before_start(job_id, &message).await?;
                return Ok(not_started);
            }
        };

        let env = WorkerJobEnv {
            job_id,
            season: target.season,
            round: target.round,
            session_codes: missing,
            database_url: destination,
            proxy: self.config.proxy.clone(),
        };

        let mut cmd = self.build_command(&executable, &env, stdout, stderr);
        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let message = format!(
                    "Failed to spawn worker {}: {e}",
                    executable.path.display()
                );
                self.fail_before_start(job_id, &message).await?;
                return Ok(not_started);
            }
        };

        tracing::info!(
            job_id,
            pid = ?child.id(),
            executable = %executable.path.display(),
            source = %executable.source,
            stderr_log = %logs.stderr.display(),
            "Worker spawned",
        );

        // The child is already running; a ledger hiccup here must not lose
        // the supervisor.
        match self.ledger.mark_running(job_id, None).await {
            Ok(true) => {}
            Ok(false) => tracing::info!(job_id, "Job left QUEUED before launcher marked it running"),
            Err(e) => tracing::error!(job_id, error = %e, "Failed to mark job running"),
        }

        let supervisor = tokio::spawn(supervise(
            Arc::clone(&self.ledger),
            job_id,
            child,
            logs,
            self.config.output_tail_lines,
        ));

        Ok(LaunchedJob {
            job_id,
            supervisor: Some(supervisor),
        })
    }

    /// Run the resolver off the async runtime; version probes block.
    async fn resolve(&self) -> Result<ResolvedExecutable, String> {
        let resolver = self.config.resolver.clone();
        let probe = Arc::clone(&self.probe);
        match tokio::task::spawn_blocking(move || resolver.resolve(probe.as_ref())).await {
            Ok(Ok(executable)) => Ok(executable),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("Executable resolution aborted: {e}")),
        }
    }

    /// Create the job's log files. The worker writes to them directly, so
    /// it never depends on this process staying alive to drain a pipe.
    async fn open_logs(&self, job_id: DbId) -> std::io::Result<(WorkerLogs, Stdio, Stdio)> {
        tokio::fs::create_dir_all(&self.config.log_dir).await?;
        let logs = WorkerLogs::for_job(&self.config.log_dir, job_id);
        let stdout = tokio::fs::File::create(&logs.stdout).await?.into_std().await;
        let stderr = tokio::fs::File::create(&logs.stderr).await?.into_std().await;
        Ok((logs, Stdio::from(stdout), Stdio::from(stderr)))
    }

    fn build_command(
        &self,
        executable: &ResolvedExecutable,
        env: &WorkerJobEnv,
        stdout: Stdio,
        stderr: Stdio,
    ) -> Command {
        let mut cmd = Command::new(&executable.path);
        cmd.args(&self.config.worker_args)
            .envs(env.to_env_vars())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(false);

        if let Some(dir) = &self.config.worker_dir {
            cmd.current_dir(dir);
        }

        // Own process group: a Ctrl-C aimed at the server does not reach
        // running workers.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }

    async fn fail_before_start(&self, job_id: DbId, message: &str) -> Result<(), sqlx::Error> {
        tracing::error!(job_id, error = %message, "Ingest job failed before the worker started");
        self.ledger.mark_failed(job_id, message).await?;
        Ok(())
    }
}
