//! Ingest orchestration: dedup check, job launch, status reads.

pub mod dedup;
pub mod launcher;
pub mod reporter;
pub mod supervisor;

use std::sync::Arc;

use pitwall_core::ingest::WeekendTarget;
use pitwall_core::session_codes::normalize_codes;
use pitwall_core::types::DbId;
use pitwall_core::worker::resolver::ExecutableProbe;
use pitwall_db::ledger::{JobLedger, SessionCatalog};
use serde::Serialize;

use crate::config::WorkerConfig;
use crate::error::AppResult;
use dedup::DedupChecker;
use launcher::{JobLauncher, LaunchedJob};
use reporter::StatusReporter;

/// Message returned when every requested session is already stored.
pub const ALREADY_EXISTS: &str = "already exists";

/// Result of a trigger request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TriggerOutcome {
    /// A job was created; poll it by id.
    Launched { job_id: DbId },
    /// Nothing to do. No job was created.
    AlreadyExists {
        message: &'static str,
        existing_sessions: Vec<String>,
    },
}

pub struct IngestService {
    dedup: DedupChecker,
    launcher: JobLauncher,
    reporter: StatusReporter,
    default_sessions: Vec<String>,
}

impl IngestService {
    pub fn new(
        ledger: Arc<dyn JobLedger>,
        catalog: Arc<dyn SessionCatalog>,
        probe: Arc<dyn ExecutableProbe>,
        config: WorkerConfig,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            dedup: DedupChecker::new(catalog),
            launcher: JobLauncher::new(Arc::clone(&ledger), probe, Arc::clone(&config)),
            reporter: StatusReporter::new(ledger, config.estimate_secs_per_session),
            default_sessions: config.default_sessions.clone(),
        }
    }

    pub fn reporter(&self) -> &StatusReporter {
        &self.reporter
    }

    /// Normalize the requested codes, drop the ones already stored, and
    /// launch a job for the rest.
    pub async fn trigger(
        &self,
        target: WeekendTarget,
        sessions: Option<Vec<String>>,
    ) -> AppResult<TriggerOutcome> {
        self.trigger_job(target, sessions)
            .await
            .map(|(outcome, _)| outcome)
    }

    /// Like [`trigger`](Self::trigger), also handing back the launched job
    /// so callers can await its supervisor.
    pub async fn trigger_job(
        &self,
        target: WeekendTarget,
        sessions: Option<Vec<String>>,
    ) -> AppResult<(TriggerOutcome, Option<LaunchedJob>)> {
        let requested = match sessions {
            Some(codes) => normalize_codes(&codes)?,
            None => normalize_codes(&self.default_sessions)?,
        };

        let check = self.dedup.compute_missing(target, &requested).await?;
        if check.is_satisfied() {
            tracing::info!(
                season = target.season,
                round = target.round,
                "All requested sessions already stored; no job created",
            );
            let outcome = TriggerOutcome::AlreadyExists {
                message: ALREADY_EXISTS,
                existing_sessions: check.existing,
            };
            return Ok((outcome, None));
        }

        let launched = self.launcher.launch(target, &check.missing).await?;
        let outcome = TriggerOutcome::Launched {
            job_id: launched.job_id,
        };
        Ok((outcome, Some(launched)))
    }
}
