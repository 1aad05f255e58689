//! Retry orchestration around the gateway, with local fallback.
//!
//! [`Annotator::annotate`] never fails: it runs up to
//! `max_retries + 1` gateway attempts (call + normalize), each bounded by
//! the gateway timeout, sleeping `attempt * delay_step` between them. When
//! no credential is configured, or every attempt fails, the result comes
//! from [`offnotes_core::fallback::fallback`] with the last error recorded
//! in its metadata.

use std::sync::Arc;

use offnotes_core::annotation::{AnnotationRequest, AnnotationResult};
use offnotes_core::fallback::fallback;
use offnotes_core::normalize::normalize;
use tokio::time::Instant;

use crate::api::{Gateway, GatewayClient, UpstreamError};
use crate::config::GatewayConfig;

/// Every gateway attempt failed.
#[derive(Debug, thiserror::Error)]
#[error("LLM gateway failed after {attempts} attempt(s): {last_error}")]
pub struct GatewayExhausted {
    /// Attempts made before giving up.
    pub attempts: u32,
    /// Error from the final attempt.
    pub last_error: UpstreamError,
}

/// Produces annotations via the gateway, falling back locally.
///
/// Cheap to share behind an `Arc`; holds no per-request state.
pub struct Annotator {
    gateway: Option<Arc<dyn Gateway>>,
    config: GatewayConfig,
}

impl Annotator {
    /// Build an annotator with a reqwest-backed gateway client, or a
    /// fallback-only annotator when no credential is configured.
    pub fn from_config(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let gateway = GatewayClient::from_config(&config)?
            .map(|client| Arc::new(client) as Arc<dyn Gateway>);
        Ok(Self { gateway, config })
    }

    /// Build an annotator around an arbitrary [`Gateway`] implementation.
    pub fn new(gateway: Option<Arc<dyn Gateway>>, config: GatewayConfig) -> Self {
        Self { gateway, config }
    }

    /// Whether the gateway path is available at all.
    pub fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    /// Annotate `request`, degrading to the local heuristic on any failure.
    pub async fn annotate(&self, request: &AnnotationRequest) -> AnnotationResult {
        let started = Instant::now();

        let Some(gateway) = self.gateway.as_deref() else {
            tracing::debug!("No gateway credential configured, using local fallback");
            return fallback(request, None)
                .with_metadata("reason", "not_configured")
                .with_metadata("attempts", 0)
                .with_processing_time(started.elapsed());
        };

        match self.annotate_via_gateway(gateway, request).await {
            Ok(result) => result.with_processing_time(started.elapsed()),
            Err(exhausted) => {
                tracing::warn!(
                    attempts = exhausted.attempts,
                    kind = exhausted.last_error.kind(),
                    error = %exhausted.last_error,
                    "Gateway attempts exhausted, using local fallback",
                );
                fallback(request, Some(&exhausted.last_error.to_string()))
                    .with_metadata("reason", "gateway_failed")
                    .with_metadata("error_kind", exhausted.last_error.kind())
                    .with_metadata("attempts", exhausted.attempts)
                    .with_processing_time(started.elapsed())
            }
        }
    }

    /// Run the attempt loop against `gateway` without falling back.
    pub async fn annotate_via_gateway(
        &self,
        gateway: &dyn Gateway,
        request: &AnnotationRequest,
    ) -> Result<AnnotationResult, GatewayExhausted> {
        let policy = self.config.retry;
        let max_attempts = policy.max_attempts();
        let model = self.config.model_for(request.model.as_deref());
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let last_error = match self.attempt(gateway, request, model).await {
                Ok(result) => {
                    tracing::info!(attempt, model, "Gateway annotation succeeded");
                    return Ok(result
                        .with_metadata("gateway", self.config.base_url.as_str())
                        .with_metadata("attempts", attempt));
                }
                Err(e) => e,
            };

            match policy.delay_after(attempt) {
                Some(delay) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        kind = last_error.kind(),
                        error = %last_error,
                        delay_ms = delay.as_millis() as u64,
                        "Gateway attempt failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(GatewayExhausted {
                        attempts: attempt,
                        last_error,
                    })
                }
            }
        }
    }

    /// One call + normalize, bounded by the gateway timeout.
    async fn attempt(
        &self,
        gateway: &dyn Gateway,
        request: &AnnotationRequest,
        model: &str,
    ) -> Result<AnnotationResult, UpstreamError> {
        let timeout = self.config.timeout();
        let call = async {
            let envelope = gateway.call_once(request, model).await?;
            Ok::<_, UpstreamError>(normalize(&envelope, request, model)?)
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(UpstreamError::Unreachable(format!(
                "attempt timed out after {}s",
                timeout.as_secs()
            ))),
        }
    }
}
