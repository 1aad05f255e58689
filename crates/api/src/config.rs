use std::time::Duration;

use offnotes_core::rate_limit::DEFAULT_REQUESTS_PER_MINUTE;
use offnotes_llm::config::GatewayConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8001`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    /// A `*` entry mirrors whatever origin the request carries.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`).
    ///
    /// Must cover every gateway attempt plus backoff, otherwise the
    /// fallback never gets a chance to answer.
    pub request_timeout_secs: u64,
    /// Annotation requests allowed per client per minute (default: `30`, `0` disables).
    pub rate_limit_per_minute: u32,
    /// Identify clients by `X-Forwarded-For` / `X-Real-IP` (default: `false`).
    ///
    /// Only enable behind a reverse proxy that overwrites these headers;
    /// otherwise callers can pick their own rate-limit identity.
    pub trust_proxy_headers: bool,
    /// Remote annotation gateway settings.
    pub gateway: GatewayConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `HOST`                     | `0.0.0.0` |
    /// | `PORT`                     | `8001`  |
    /// | `CORS_ORIGINS`             | `*`     |
    /// | `REQUEST_TIMEOUT_SECS`     | `120`   |
    /// | `AI_RATE_LIMIT_PER_MINUTE` | `30`    |
    /// | `TRUST_PROXY_HEADERS`      | `false` |
    ///
    /// Gateway variables are documented on [`GatewayConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8001".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let rate_limit_per_minute: u32 = std::env::var("AI_RATE_LIMIT_PER_MINUTE")
            .unwrap_or_else(|_| DEFAULT_REQUESTS_PER_MINUTE.to_string())
            .parse()
            .expect("AI_RATE_LIMIT_PER_MINUTE must be a valid u32");

        let trust_proxy_headers: bool = std::env::var("TRUST_PROXY_HEADERS")
            .unwrap_or_else(|_| "false".into())
            .trim()
            .to_ascii_lowercase()
            .parse()
            .expect("TRUST_PROXY_HEADERS must be true or false");

        let gateway = GatewayConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            rate_limit_per_minute,
            trust_proxy_headers,
            gateway,
        }
    }

    /// Whether the request timeout outlasts the slowest gateway path.
    ///
    /// When it does not, the timeout layer answers 408 before the annotator
    /// gets to fall back.
    pub fn request_timeout_covers_gateway(&self) -> bool {
        Duration::from_secs(self.request_timeout_secs) > self.gateway.worst_case_duration()
    }

    /// Whether any configured origin is the `*` wildcard.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
