//! Handlers for the status-check resource and the API root greeting.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use offnotes_core::error::CoreError;
use offnotes_db::models::status_check::{CreateStatusCheck, StatusCheck};
use offnotes_db::repositories::StatusCheckRepo;
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/
pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Hello World" }))
}

/// POST /api/status
///
/// Record that a client pinged the backend.
pub async fn create_status_check(
    State(state): State<AppState>,
    payload: Result<Json<CreateStatusCheck>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    input.validate()?;
    if input.client_name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "client_name: must not be blank".into(),
        )));
    }

    let check = StatusCheckRepo::create(&state.pool, &input).await?;

    tracing::info!(
        status_check_id = %check.id,
        client_name = %check.client_name,
        "Status check recorded",
    );

    Ok((StatusCode::OK, Json(check)))
}

/// GET /api/status
///
/// List recorded status checks, oldest first.
pub async fn list_status_checks(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<StatusCheck>>> {
    let checks = StatusCheckRepo::list(&state.pool).await?;
    Ok(Json(checks))
}
