//! Integration tests for the ingest job ledger and the dedup read path.
//!
//! Each test gets a fresh database with the workspace migrations applied.

use pitwall_core::ingest::{IngestStatus, WeekendTarget};
use pitwall_core::session_codes::compute_missing;
use pitwall_db::ledger::{JobLedger, PgLedger, PgSessionCatalog, SessionCatalog};
use pitwall_db::repositories::{IngestJobRepo, SessionRepo};
use sqlx::PgPool;

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Ledger lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_returns_queued_job_with_generated_id(pool: PgPool) {
    let job = IngestJobRepo::create(&pool, 2024, 5, &codes(&["R"]))
        .await
        .unwrap();

    assert!(job.id > 0);
    assert_eq!(job.status, IngestStatus::Queued);
    assert_eq!(job.requested_codes, codes(&["R"]));
    assert!(job.started_at.is_none());
    assert!(job.finished_at.is_none());
    assert!(job.error.is_none());
    assert!(job.progress.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failure_is_terminal_and_carries_error(pool: PgPool) {
    let ledger = PgLedger::new(pool.clone());
    let job = ledger
        .create(WeekendTarget::new(2024, 5).unwrap(), &codes(&["Q", "R"]))
        .await
        .unwrap();

    assert!(ledger.mark_running(job.id, None).await.unwrap());
    assert!(ledger.mark_failed(job.id, "Worker exited with status 1").await.unwrap());

    // Late writes from a worker that kept running are ignored.
    assert!(!ledger.mark_success(job.id).await.unwrap());
    assert!(!ledger.record_progress(job.id, "Q", 50).await.unwrap());
    assert!(!ledger.mark_running(job.id, None).await.unwrap());

    let job = ledger.find(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, IngestStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("Worker exited with status 1"));
    assert!(job.started_at.is_some());
    assert!(job.finished_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn worker_success_completes_progress(pool: PgPool) {
    let ledger = PgLedger::new(pool.clone());
    let job = ledger
        .create(WeekendTarget::new(2024, 5).unwrap(), &codes(&["Q", "R"]))
        .await
        .unwrap();

    ledger.mark_running(job.id, Some("https://ci.example/runs/7")).await.unwrap();
    assert!(ledger.record_progress(job.id, "Q", 10).await.unwrap());
    assert!(ledger.record_progress(job.id, "Q", 100).await.unwrap());
    assert!(ledger.mark_success(job.id).await.unwrap());
    assert!(!ledger.mark_failed(job.id, "too late").await.unwrap());

    let job = ledger.find(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, IngestStatus::Success);
    assert_eq!(job.log_url.as_deref(), Some("https://ci.example/runs/7"));
    assert!(job.error.is_none());
    assert!(job.finished_at.is_some());

    let progress = job.progress_map().expect("progress was reported");
    assert_eq!(progress.get("Q"), Some(&100));
    assert_eq!(progress.get("R"), Some(&100));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn started_at_keeps_first_value(pool: PgPool) {
    let job = IngestJobRepo::create(&pool, 2024, 1, &codes(&["Q"])).await.unwrap();
    IngestJobRepo::mark_running(&pool, job.id, None).await.unwrap();
    let first = IngestJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();

    IngestJobRepo::mark_running(&pool, job.id, None).await.unwrap();
    let second = IngestJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();

    assert_eq!(first.started_at, second.started_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_job_is_none(pool: PgPool) {
    assert!(IngestJobRepo::find_by_id(&pool, 424242).await.unwrap().is_none());
    assert!(!IngestJobRepo::mark_failed(&pool, 424242, "x").await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_recent_is_newest_first(pool: PgPool) {
    let mut ids = Vec::new();
    for round in 1..=3 {
        ids.push(IngestJobRepo::create(&pool, 2024, round, &codes(&["R"])).await.unwrap().id);
    }

    let jobs = IngestJobRepo::list_recent(&pool, 2).await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, ids[2]);
    assert_eq!(jobs[1].id, ids[1]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_creates_are_independent_rows(pool: PgPool) {
    let target = WeekendTarget::new(2024, 5).unwrap();
    let ledger = PgLedger::new(pool.clone());
    let missing = codes(&["R"]);

    let (a, b) = tokio::join!(ledger.create(target, &missing), ledger.create(target, &missing));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.id, b.id);
    assert_eq!(a.requested_codes, b.requested_codes);
}

// ---------------------------------------------------------------------------
// Schema invariants
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn schema_rejects_failed_without_error(pool: PgPool) {
    let job = IngestJobRepo::create(&pool, 2024, 2, &codes(&["R"])).await.unwrap();
    let result = sqlx::query(
        "UPDATE ingest_jobs SET status = 'FAILED', finished_at = NOW() WHERE id = $1",
    )
    .bind(job.id)
    .execute(&pool)
    .await;
    assert!(result.is_err(), "FAILED without error must violate a check");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn schema_rejects_empty_code_list(pool: PgPool) {
    let result = IngestJobRepo::create(&pool, 2024, 2, &[]).await;
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Dedup read path
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn existing_codes_drive_missing_set(pool: PgPool) {
    let weekend_id = SessionRepo::upsert_weekend(&pool, 2024, 5, Some("Miami Grand Prix"))
        .await
        .unwrap();
    SessionRepo::upsert_session(&pool, weekend_id, "Q", None).await.unwrap();

    let catalog = PgSessionCatalog::new(pool.clone());
    let existing = catalog
        .existing_codes(WeekendTarget::new(2024, 5).unwrap())
        .await
        .unwrap();
    assert_eq!(existing, codes(&["Q"]));

    let missing = compute_missing(&codes(&["Q", "R"]), &existing);
    assert_eq!(missing, codes(&["R"]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn session_upserts_are_idempotent(pool: PgPool) {
    let first = SessionRepo::upsert_weekend(&pool, 2024, 5, Some("Miami")).await.unwrap();
    let second = SessionRepo::upsert_weekend(&pool, 2024, 5, None).await.unwrap();
    assert_eq!(first, second);

    let a = SessionRepo::upsert_session(&pool, first, "R", None).await.unwrap();
    let b = SessionRepo::upsert_session(&pool, first, "R", None).await.unwrap();
    assert_eq!(a.id, b.id);

    let existing = SessionRepo::existing_codes(&pool, 2024, 5).await.unwrap();
    assert_eq!(existing, codes(&["R"]));
}
