//! Handler for the AI annotation endpoint.
//!
//! Validation and throttling are the only caller-visible failures. Gateway
//! trouble is absorbed by the [`Annotator`](offnotes_llm::annotator::Annotator),
//! which answers from the local fallback instead.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use offnotes_core::annotation::{AnnotationRequest, AnnotationResult};
use offnotes_core::error::CoreError;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::client_ip::ClientId;
use crate::state::AppState;

/// POST /api/ai/annotate
///
/// Annotate free-form text with categories, tags, a summary and an
/// optional confidence score.
pub async fn annotate(
    State(state): State<AppState>,
    client: ClientId,
    payload: Result<Json<AnnotationRequest>, JsonRejection>,
) -> AppResult<Json<AnnotationResult>> {
    let Json(input) = payload?;
    input.validate()?;

    if let Err(rejected) = state.rate_guard.admit(client.as_str()).await {
        tracing::info!(
            client = %client,
            retry_after_secs = rejected.retry_after.as_secs(),
            "Annotation request throttled",
        );
        return Err(AppError::Core(CoreError::from(rejected)));
    }

    tracing::debug!(
        client = %client,
        text_chars = input.text.chars().count(),
        custom_categories = input.custom_categories().map_or(0, <[String]>::len),
        "Annotating text",
    );

    let result = state.annotator.annotate(&input).await;

    tracing::info!(
        client = %client,
        categories = result.categories.len(),
        tags = result.tags.len(),
        processing_time = result.processing_time,
        "Annotation complete",
    );

    Ok(Json(result))
}
