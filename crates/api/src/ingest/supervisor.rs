//! Watches a spawned worker until it exits.
//!
//! The supervisor only ever writes failures. A clean exit is logged and
//! left alone: the worker reports its own success through the ledger.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pitwall_core::types::DbId;
use pitwall_core::worker::output::{exit_failure_message, OutputTail, MAX_TAIL_BYTES};
use pitwall_db::ledger::JobLedger;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::process::Child;

/// How a supervised worker ended, as seen from the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// Exit status 0. The job's final state is whatever the worker wrote.
    Clean,
    /// Non-zero exit or killed by a signal.
    Failed {
        exit_code: Option<i32>,
        message: String,
    },
    /// The parent could not wait on the child.
    Lost { message: String },
}

/// Files a worker's stdout and stderr are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLogs {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

impl WorkerLogs {
    pub fn for_job(dir: &Path, job_id: DbId) -> Self {
        Self {
            stdout: dir.join(format!("job-{job_id}.stdout.log")),
            stderr: dir.join(format!("job-{job_id}.stderr.log")),
        }
    }
}

/// Wait for the worker and record a failure if it exited unsuccessfully.
pub async fn supervise(
    ledger: Arc<dyn JobLedger>,
    job_id: DbId,
    mut child: Child,
    logs: WorkerLogs,
    tail_lines: usize,
) -> WorkerExit {
    match child.wait().await {
        Ok(status) if status.success() => {
            tracing::info!(job_id, "Worker exited with status 0");
            warn_if_unreported(ledger.as_ref(), job_id).await;
            WorkerExit::Clean
        }
        Ok(status) => {
            let exit_code = status.code();
            let stderr = read_tail(&logs.stderr, tail_lines).await;
            let stdout = read_tail(&logs.stdout, tail_lines).await;
            let message = exit_failure_message(exit_code, &stderr, &stdout);
            record_failure(ledger.as_ref(), job_id, &message).await;
            tracing::warn!(
                job_id,
                exit_code = ?exit_code,
                stderr_log = %logs.stderr.display(),
                "Worker exited unsuccessfully",
            );
            WorkerExit::Failed { exit_code, message }
        }
        Err(e) => {
            let message = format!("Lost track of worker process: {e}");
            record_failure(ledger.as_ref(), job_id, &message).await;
            tracing::error!(job_id, error = %e, "Failed to wait on worker");
            WorkerExit::Lost { message }
        }
    }
}

/// Last lines of a worker log. An unreadable log yields an empty tail.
pub async fn read_tail(path: &Path, capacity: usize) -> OutputTail {
    match read_last_bytes(path).await {
        Ok((bytes, cut)) => OutputTail::from_log(capacity, &bytes, cut),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read worker log");
            OutputTail::new(capacity)
        }
    }
}

/// At most [`MAX_TAIL_BYTES`] from the end of `path`, and whether
/// anything before them was skipped.
async fn read_last_bytes(path: &Path) -> std::io::Result<(Vec<u8>, bool)> {
    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let start = len.saturating_sub(MAX_TAIL_BYTES);
    file.seek(SeekFrom::Start(start)).await?;

    let mut buf = Vec::new();
    (&mut file).take(MAX_TAIL_BYTES).read_to_end(&mut buf).await?;
    Ok((buf, start > 0))
}

async fn record_failure(ledger: &dyn JobLedger, job_id: DbId, message: &str) {
    match ledger.mark_failed(job_id, message).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(job_id, "Job already terminal; exit failure not recorded");
        }
        Err(e) => {
            tracing::error!(job_id, error = %e, "Failed to record worker failure");
        }
    }
}

async fn warn_if_unreported(ledger: &dyn JobLedger, job_id: DbId) {
    match ledger.find(job_id).await {
        Ok(Some(job)) if !job.status.is_terminal() => {
            tracing::warn!(
                job_id,
                status = %job.status,
                "Worker exited cleanly without reporting success",
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(job_id, error = %e, "Failed to read job after worker exit");
        }
    }
}
