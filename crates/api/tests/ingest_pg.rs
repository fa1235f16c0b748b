//! Trigger and status routes over the Postgres ledger.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use common::{bearer, body_json, build_pg_app, get, post_json, unresolvable_worker_config};

#[sqlx::test(migrations = "../../db/migrations")]
async fn trigger_against_postgres_dedups_stored_sessions(pool: PgPool) {
    sqlx::query(
        "WITH w AS (INSERT INTO weekends (season, round) VALUES (2024, 9) RETURNING id) \
         INSERT INTO sessions (weekend_id, session_code) SELECT id, 'Q' FROM w",
    )
    .execute(&pool)
    .await
    .unwrap();

    let app = build_pg_app(pool.clone(), unresolvable_worker_config());

    let response = post_json(
        app.clone(),
        "/api/v1/ingest",
        json!({ "season": 2024, "round": 9, "sessions": ["Q"] }),
        Some(&bearer()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["existing_sessions"], json!(["Q"]));

    let response = post_json(
        app.clone(),
        "/api/v1/ingest",
        json!({ "season": 2024, "round": 9, "sessions": ["Q", "R"] }),
        Some(&bearer()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let job_id = body_json(response).await["data"]["job_id"].as_i64().unwrap();

    let body = body_json(get(app, &format!("/api/v1/ingest/jobs/{job_id}")).await).await;
    assert_eq!(body["data"]["requested_codes"], json!(["R"]));
    assert_eq!(body["data"]["status"], "FAILED");
}
