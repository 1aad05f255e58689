use std::sync::Arc;

use offnotes_core::rate_limit::RateGuard;
use offnotes_llm::annotator::Annotator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (status checks only).
    pub pool: offnotes_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Gateway-backed annotator with local fallback.
    pub annotator: Arc<Annotator>,
    /// Per-client throttle for the annotation endpoint.
    pub rate_guard: Arc<dyn RateGuard>,
}
