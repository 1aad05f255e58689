pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /                      greeting (GET)
/// /status                list, record (GET, POST)
/// /ai/annotate           annotate text (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::status::root))
        .route(
            "/status",
            get(handlers::status::list_status_checks).post(handlers::status::create_status_check),
        )
        .route("/ai/annotate", post(handlers::annotate::annotate))
}
