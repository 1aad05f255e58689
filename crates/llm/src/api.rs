//! HTTP client for the gateway's `/chat/completions` endpoint.
//!
//! [`GatewayClient`] performs exactly one call per [`Gateway::call_once`]
//! and classifies the outcome into an [`UpstreamError`] kind; retrying is
//! the [`crate::annotator`]'s job.

use async_trait::async_trait;
use offnotes_core::annotation::{truncate_chars, AnnotationRequest, MAX_METADATA_ERROR_CHARS};
use offnotes_core::normalize::MalformedResponse;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::prompt::chat_payload;

/// `User-Agent` sent to the gateway.
pub const CLIENT_USER_AGENT: &str = "offline-notes/ai-annotate";

/// Why a gateway attempt did not produce an annotation.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The gateway rejected the credential (HTTP 401).
    #[error("Unauthorized from LLM gateway")]
    Unauthorized,

    /// The gateway throttled the request (HTTP 429).
    #[error("LLM gateway rate limit reached")]
    RateLimited,

    /// Network failure, DNS, TLS, or timeout.
    #[error("LLM gateway unreachable: {0}")]
    Unreachable(String),

    /// Any other non-2xx status.
    #[error("LLM gateway returned HTTP {status}: {body}")]
    BadStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated, for diagnostics.
        body: String,
    },

    /// The reply arrived but could not be coerced into an annotation.
    #[error(transparent)]
    Malformed(#[from] MalformedResponse),
}

impl UpstreamError {
    /// Short machine-readable kind, used in logs and result metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::Unreachable(_) => "unreachable",
            Self::BadStatus { .. } => "bad_status",
            Self::Malformed(_) => "malformed_response",
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unreachable(err.to_string())
    }
}

/// One remote annotation call. Implemented by [`GatewayClient`]; tests
/// substitute scripted implementations.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send `request` to the gateway using `model` and return the raw
    /// chat-completion envelope.
    async fn call_once(
        &self,
        request: &AnnotationRequest,
        model: &str,
    ) -> Result<Value, UpstreamError>;
}

/// reqwest-backed [`Gateway`] talking to `{base_url}/chat/completions`.
pub struct GatewayClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GatewayClient {
    /// Create a client from configuration.
    ///
    /// Returns `None` when no credential is configured.
    pub fn from_config(config: &GatewayConfig) -> Result<Option<Self>, reqwest::Error> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Some(Self::with_client(client, config.completions_url(), api_key)))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, endpoint: String, api_key: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }

    /// Map a response status to an error kind, reading the body for diagnostics.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status {
            StatusCode::UNAUTHORIZED => Err(UpstreamError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(UpstreamError::RateLimited),
            _ => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<unreadable body>".to_string());
                Err(UpstreamError::BadStatus {
                    status: status.as_u16(),
                    body: truncate_chars(&body, MAX_METADATA_ERROR_CHARS),
                })
            }
        }
    }
}

#[async_trait]
impl Gateway for GatewayClient {
    async fn call_once(
        &self,
        request: &AnnotationRequest,
        model: &str,
    ) -> Result<Value, UpstreamError> {
        let payload = chat_payload(request, model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .json(&payload)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;

        serde_json::from_str::<Value>(&body)
            .map_err(|e| UpstreamError::Malformed(MalformedResponse::InvalidJson(e.to_string())))
    }
}
