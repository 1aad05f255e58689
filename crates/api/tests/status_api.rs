//! Integration tests for the status-check endpoints and the API greeting.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Test: GET /api/ greets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_root_says_hello() {
    let app = common::build_test_app(common::lazy_pool());
    let response = get(app, "/api/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "message": "Hello World" }));
}

// ---------------------------------------------------------------------------
// Test: POST /api/status records a check
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_status_check_returns_record(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/status", json!({ "client_name": "web-ui" })).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["client_name"], "web-ui");
    assert_eq!(json["id"].as_str().unwrap().len(), 36, "id should be a UUID");
    assert!(json["timestamp"].is_string());
}

// ---------------------------------------------------------------------------
// Test: empty or blank client_name is rejected
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_client_name_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app.clone(), "/api/status", json!({ "client_name": "" })).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = post_json(app, "/api/status", json!({ "client_name": "   " })).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ---------------------------------------------------------------------------
// Test: GET /api/status lists checks oldest first
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_status_checks_oldest_first(pool: PgPool) {
    // Explicit, distinct timestamps, inserted out of order.
    for (name, age_secs) in [("second", 20.0), ("third", 10.0), ("first", 30.0)] {
        sqlx::query(
            "INSERT INTO status_checks (id, client_name, created_at) \
             VALUES (gen_random_uuid(), $1, now() - make_interval(secs => $2))",
        )
        .bind(name)
        .bind(age_secs)
        .execute(&pool)
        .await
        .unwrap();
    }

    let app = common::build_test_app(pool);
    let response = get(app, "/api/status").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["client_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_is_empty_initially(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/status").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}
