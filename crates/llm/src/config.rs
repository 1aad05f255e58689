use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default gateway base URL (the `/chat/completions` path is appended).
pub const DEFAULT_BASE_URL: &str = "https://api.emergent-llm.gateway/v1";

/// Default model when the request does not name one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default per-attempt timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 25;

/// Gateway connection settings.
///
/// `api_key` is `None` when no credential is configured; in that case the
/// annotator never touches the network.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Bearer credential for the gateway.
    pub api_key: Option<String>,
    /// Base URL without trailing slash, e.g. `https://host/v1`.
    pub base_url: String,
    /// Model used when the request does not override it.
    pub default_model: String,
    /// Timeout for a single attempt, in seconds.
    pub timeout_secs: u64,
    /// Attempt budget and backoff between attempts.
    pub retry: RetryPolicy,
}

impl GatewayConfig {
    /// Load gateway configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                               |
    /// |--------------------------|---------------------------------------|
    /// | `EMERGENT_LLM_KEY`       | unset (fallback only)                 |
    /// | `EMERGENT_LLM_BASE_URL`  | `https://api.emergent-llm.gateway/v1` |
    /// | `EMERGENT_DEFAULT_MODEL` | `gpt-4o-mini`                         |
    /// | `AI_TIMEOUT_SECS`        | `25`                                  |
    /// | `AI_MAX_RETRIES`         | `2`                                   |
    /// | `AI_RETRY_DELAY_MS`      | `1500`                                |
    pub fn from_env() -> Self {
        let api_key = std::env::var("EMERGENT_LLM_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let base_url = std::env::var("EMERGENT_LLM_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();

        let default_model =
            std::env::var("EMERGENT_DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

        let timeout_secs: u64 = env_or("AI_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_retries: env_or("AI_MAX_RETRIES", defaults.max_retries),
            delay_step: Duration::from_millis(env_or(
                "AI_RETRY_DELAY_MS",
                defaults.delay_step.as_millis() as u64,
            )),
        };

        Self {
            api_key,
            base_url,
            default_model,
            timeout_secs,
            retry,
        }
    }

    /// Per-attempt timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Longest an annotation can spend on the gateway before falling back:
    /// every attempt hitting its timeout plus every backoff wait.
    pub fn worst_case_duration(&self) -> Duration {
        self.timeout()
            .saturating_mul(self.retry.max_attempts())
            .saturating_add(self.retry.total_backoff())
    }

    /// Full URL of the chat-completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Model to use for a request carrying an optional override.
    pub fn model_for<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            default_model: DEFAULT_MODEL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Read and parse an env var, falling back to `default` when unset.
///
/// Panics on an unparseable value so misconfiguration fails at startup.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid value: {e}")),
        Err(_) => default,
    }
}
