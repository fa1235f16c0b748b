//! Worker-side status reporting.
//!
//! The ingest worker is the only party allowed to declare a job
//! `SUCCESS`. It does so by writing straight to the job ledger, either
//! through the `pitwall-report` binary or by linking this library. Every
//! write is a single-row update that is ignored once the job is terminal.

use std::sync::Arc;

use pitwall_core::error::CoreError;
use pitwall_core::progress::validate_percent;
use pitwall_core::session_codes::normalize_codes;
use pitwall_core::types::DbId;
use pitwall_db::ledger::JobLedger;

/// Used when a failure report carries no message.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Worker reported failure without details";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("Ledger write failed: {0}")]
    Ledger(#[from] sqlx::Error),

    /// The job does not exist or is already terminal.
    #[error("Job {job_id} did not accept {action}: it is missing or already finished")]
    Rejected { job_id: DbId, action: &'static str },
}

/// Reports the lifecycle of one job.
pub struct WorkerReporter {
    ledger: Arc<dyn JobLedger>,
    job_id: DbId,
}

impl WorkerReporter {
    pub fn new(ledger: Arc<dyn JobLedger>, job_id: DbId) -> Self {
        Self { ledger, job_id }
    }

    pub fn job_id(&self) -> DbId {
        self.job_id
    }

    /// Mark the job running, optionally recording where its log lives.
    ///
    /// Returns `false` when the job was already terminal.
    pub async fn running(&self, log_url: Option<&str>) -> Result<bool, ReportError> {
        let applied = self.ledger.mark_running(self.job_id, log_url).await?;
        if applied {
            tracing::info!(job_id = self.job_id, log_url = ?log_url, "Reported RUNNING");
        } else {
            tracing::warn!(job_id = self.job_id, "RUNNING report ignored");
        }
        Ok(applied)
    }

    /// Record measured progress for one session.
    ///
    /// Returns `false` when the job was already terminal.
    pub async fn progress(&self, session_code: &str, percent: i64) -> Result<bool, ReportError> {
        let code = normalize_codes(&[session_code])?.remove(0);
        let percent = validate_percent(percent)?;

        let applied = self
            .ledger
            .record_progress(self.job_id, &code, percent)
            .await?;
        if applied {
            tracing::debug!(job_id = self.job_id, session = %code, percent, "Reported progress");
        } else {
            tracing::warn!(job_id = self.job_id, session = %code, "Progress report ignored");
        }
        Ok(applied)
    }

    /// Declare the job complete. Call only after every session has been
    /// durably written.
    pub async fn success(&self) -> Result<(), ReportError> {
        if !self.ledger.mark_success(self.job_id).await? {
            return Err(ReportError::Rejected {
                job_id: self.job_id,
                action: "SUCCESS",
            });
        }
        tracing::info!(job_id = self.job_id, "Reported SUCCESS");
        Ok(())
    }

    /// Declare the job failed.
    ///
    /// Returns `false` when the job was already terminal.
    pub async fn failed(&self, error: &str) -> Result<bool, ReportError> {
        let error = match error.trim() {
            "" => DEFAULT_FAILURE_MESSAGE,
            _ => error,
        };
        let applied = self.ledger.mark_failed(self.job_id, error).await?;
        if applied {
            tracing::info!(job_id = self.job_id, "Reported FAILED");
        } else {
            tracing::warn!(job_id = self.job_id, "FAILED report ignored");
        }
        Ok(applied)
    }
}

/// Link to the CI run executing this worker, built from the GitHub
/// Actions environment (`GITHUB_SERVER_URL`, `GITHUB_REPOSITORY`,
/// `GITHUB_RUN_ID`).
pub fn ci_log_url<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let repository = non_empty("GITHUB_REPOSITORY")?;
    let run_id = non_empty("GITHUB_RUN_ID")?;
    let server = non_empty("GITHUB_SERVER_URL").unwrap_or_else(|| "https://github.com".into());

    Some(format!(
        "{}/{repository}/actions/runs/{run_id}",
        server.trim_end_matches('/')
    ))
}
