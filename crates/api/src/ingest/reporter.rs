//! Read-only status queries over the job ledger.

use std::sync::Arc;

use chrono::Utc;
use pitwall_core::error::CoreError;
use pitwall_core::ingest::{IngestStatus, ENTITY_INGEST_JOB};
use pitwall_core::progress::{estimate_progress, ProgressEstimate};
use pitwall_core::types::{DbId, Timestamp};
use pitwall_db::ledger::JobLedger;
use pitwall_db::models::ingest_job::IngestJob;
use pitwall_db::repositories::ingest_job_repo::clamp_limit;
use serde::Serialize;

use crate::error::AppResult;

/// A job as returned to clients.
///
/// `progress_estimate` is only filled in for running jobs with no measured
/// progress. It is computed per read and never stored.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    #[serde(flatten)]
    pub job: IngestJob,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_estimate: Option<ProgressEstimate>,
}

impl JobSnapshot {
    pub fn new(job: IngestJob, now: Timestamp, secs_per_session: u64) -> Self {
        let progress_estimate = match (job.status, &job.progress, job.started_at) {
            (IngestStatus::Running, None, Some(started_at)) => {
                let elapsed = (now - started_at).num_seconds().max(0) as u64;
                Some(estimate_progress(
                    elapsed,
                    job.requested_codes.len(),
                    secs_per_session,
                ))
            }
            _ => None,
        };
        Self {
            job,
            progress_estimate,
        }
    }
}

pub struct StatusReporter {
    ledger: Arc<dyn JobLedger>,
    secs_per_session: u64,
}

impl StatusReporter {
    pub fn new(ledger: Arc<dyn JobLedger>, secs_per_session: u64) -> Self {
        Self {
            ledger,
            secs_per_session,
        }
    }

    /// Snapshot of one job, or `NotFound`.
    pub async fn get_job(&self, id: DbId) -> AppResult<JobSnapshot> {
        let job = self
            .ledger
            .find(id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: ENTITY_INGEST_JOB,
                id,
            })?;
        Ok(JobSnapshot::new(job, Utc::now(), self.secs_per_session))
    }

    /// Most recent jobs, newest first. `limit` defaults to 20, max 100.
    pub async fn list_recent(&self, limit: Option<i64>) -> AppResult<Vec<JobSnapshot>> {
        let jobs = self.ledger.list_recent(clamp_limit(limit)).await?;
        let now = Utc::now();
        Ok(jobs
            .into_iter()
            .map(|job| JobSnapshot::new(job, now, self.secs_per_session))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;
    use pitwall_core::ingest::WeekendTarget;
    use pitwall_core::progress::ProgressMap;
    use pitwall_db::memory::MemoryLedger;
    use sqlx::types::Json;

    use super::*;
    use crate::error::AppError;

    fn job(status: IngestStatus, started: Option<Timestamp>) -> IngestJob {
        IngestJob {
            id: 1,
            season: 2024,
            round: 3,
            requested_codes: vec!["Q".into(), "R".into()],
            status,
            created_at: Utc::now(),
            started_at: started,
            finished_at: None,
            error: None,
            progress: None,
            log_url: None,
        }
    }

    #[test]
    fn running_job_without_progress_gets_estimate() {
        let now = Utc::now();
        let snap = JobSnapshot::new(
            job(IngestStatus::Running, Some(now - Duration::seconds(90))),
            now,
            90,
        );
        let estimate = snap.progress_estimate.expect("estimate");
        assert_eq!(estimate.kind, "estimate");
        assert_eq!(estimate.percent, 50);
        assert_eq!(estimate.elapsed_secs, 90);
    }

    #[test]
    fn measured_progress_suppresses_estimate() {
        let now = Utc::now();
        let mut j = job(IngestStatus::Running, Some(now - Duration::seconds(30)));
        let mut map = ProgressMap::new();
        map.insert("Q".into(), 40);
        j.progress = Some(Json(map));

        let snap = JobSnapshot::new(j, now, 90);
        assert!(snap.progress_estimate.is_none());
    }

    #[test]
    fn queued_and_terminal_jobs_have_no_estimate() {
        let now = Utc::now();
        assert!(JobSnapshot::new(job(IngestStatus::Queued, None), now, 90)
            .progress_estimate
            .is_none());
        assert!(
            JobSnapshot::new(job(IngestStatus::Failed, Some(now)), now, 90)
                .progress_estimate
                .is_none()
        );
    }

    #[test]
    fn snapshot_serializes_flat() {
        let now = Utc::now();
        let snap = JobSnapshot::new(job(IngestStatus::Running, Some(now)), now, 90);
        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(value["status"], "RUNNING");
        assert_eq!(value["season"], 2024);
        assert_eq!(value["progress_estimate"]["kind"], "estimate");

        let queued = JobSnapshot::new(job(IngestStatus::Queued, None), now, 90);
        let value = serde_json::to_value(&queued).unwrap();
        assert!(value.get("progress_estimate").is_none());
        assert!(value["progress"].is_null());
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let reporter = StatusReporter::new(Arc::new(MemoryLedger::new()), 90);
        let err = reporter.get_job(404).await.unwrap_err();
        assert_matches!(
            err,
            AppError::Core(CoreError::NotFound { id: 404, .. })
        );
    }

    #[tokio::test]
    async fn list_recent_is_newest_first() {
        let ledger = Arc::new(MemoryLedger::new());
        let target = WeekendTarget::new(2024, 1).unwrap();
        let first = ledger.create(target, &["Q".to_string()]).await.unwrap();
        let second = ledger.create(target, &["R".to_string()]).await.unwrap();

        let reporter = StatusReporter::new(ledger, 90);
        let jobs = reporter.list_recent(None).await.unwrap();
        let ids: Vec<DbId> = jobs.iter().map(|s| s.job.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
