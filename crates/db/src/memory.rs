//! In-memory [`JobLedger`] and [`SessionCatalog`].
//!
//! Used by tests and local tooling. Transitions follow the same rules as
//! the SQL guards in `IngestJobRepo`, expressed through
//! [`IngestStatus::can_transition_to`].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use pitwall_core::ingest::{IngestStatus, TransitionSource, WeekendTarget};
use pitwall_core::progress::{complete_all, merge_progress, ProgressMap};
use pitwall_core::types::DbId;
use sqlx::types::Json;
use tokio::sync::Mutex;

use crate::ledger::{JobLedger, SessionCatalog};
use crate::models::ingest_job::IngestJob;

/// Ledger holding jobs in a map keyed by id.
#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    next_id: DbId,
    jobs: BTreeMap<DbId, IngestJob>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs ever created.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Apply `f` to a job if `next` is an accepted transition from `source`.
    async fn transition<F>(
        &self,
        id: DbId,
        next: IngestStatus,
        source: TransitionSource,
        f: F,
    ) -> bool
    where
        F: FnOnce(&mut IngestJob) + Send,
    {
        let mut state = self.inner.lock().await;
        match state.jobs.get_mut(&id) {
            Some(job) if job.status.can_transition_to(next, source) => {
                f(job);
                job.status = next;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl JobLedger for MemoryLedger {
    async fn create(
        &self,
        target: WeekendTarget,
        requested_codes: &[String],
    ) -> Result<IngestJob, sqlx::Error> {
        let mut state = self.inner.lock().await;
        state.next_id += 1;
        let job = IngestJob {
            id: state.next_id,
            season: target.season,
            round: target.round,
            requested_codes: requested_codes.to_vec(),
            status: IngestStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
            progress: None,
            log_url: None,
        };
        state.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn mark_running(&self, id: DbId, log_url: Option<&str>) -> Result<bool, sqlx::Error> {
        let log_url = log_url.map(str::to_string);
        Ok(self
            .transition(id, IngestStatus::Running, TransitionSource::Worker, |job| {
                job.started_at.get_or_insert_with(Utc::now);
                if log_url.is_some() {
                    job.log_url = log_url;
                }
            })
            .await)
    }

    async fn mark_failed(&self, id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let error = error.to_string();
        Ok(self
            .transition(id, IngestStatus::Failed, TransitionSource::Launcher, |job| {
                job.error = Some(error);
                job.finished_at = Some(Utc::now());
            })
            .await)
    }

    async fn mark_success(&self, id: DbId) -> Result<bool, sqlx::Error> {
        Ok(self
            .transition(id, IngestStatus::Success, TransitionSource::Worker, |job| {
                let requested = job.requested_codes.clone();
                if let Some(Json(progress)) = job.progress.as_mut() {
                    complete_all(progress, &requested);
                }
                job.finished_at = Some(Utc::now());
            })
            .await)
    }

    async fn record_progress(
        &self,
        id: DbId,
        session_code: &str,
        percent: u8,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.inner.lock().await;
        match state.jobs.get_mut(&id) {
            Some(job) if !job.status.is_terminal() => {
                let progress = job.progress.get_or_insert_with(|| Json(ProgressMap::new()));
                merge_progress(&mut progress.0, session_code, percent);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find(&self, id: DbId) -> Result<Option<IngestJob>, sqlx::Error> {
        Ok(self.inner.lock().await.jobs.get(&id).cloned())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<IngestJob>, sqlx::Error> {
        let state = self.inner.lock().await;
        let mut jobs: Vec<IngestJob> = state.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        jobs.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
        Ok(jobs)
    }
}

/// Session catalog holding codes per weekend.
#[derive(Default)]
pub struct MemorySessionCatalog {
    sessions: Mutex<HashMap<(i32, i32), Vec<String>>>,
}

impl MemorySessionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session as present. Repeated inserts are no-ops.
    pub async fn insert(&self, target: WeekendTarget, code: &str) {
        let mut sessions = self.sessions.lock().await;
        let codes = sessions.entry((target.season, target.round)).or_default();
        if !codes.iter().any(|c| c == code) {
            codes.push(code.to_string());
        }
    }
}

#[async_trait]
impl SessionCatalog for MemorySessionCatalog {
    async fn existing_codes(&self, target: WeekendTarget) -> Result<Vec<String>, sqlx::Error> {
        Ok(self
            .sessions
            .lock()
            .await
            .get(&(target.season, target.round))
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
