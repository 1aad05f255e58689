//! Client identification for per-client rate limiting.

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::state::AppState;

/// Identifier used when nothing better is known about the caller.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort identity of the caller.
///
/// By default this is the TCP peer address (available when the server is
/// started with `into_make_service_with_connect_info`), else
/// [`UNKNOWN_CLIENT`]. With `trust_proxy_headers` enabled, the first entry of
/// `X-Forwarded-For`, then `X-Real-IP`, take precedence over the peer.
///
/// ```ignore
/// async fn my_handler(client: ClientId) -> impl IntoResponse {
///     tracing::info!(client = %client, "handling request");
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    /// Resolve the identifier from the peer address, and from the forwarding
    /// headers only when `trust_proxy` is set.
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> Self {
        let from_proxy = if trust_proxy {
            Self::forwarded_for(headers)
        } else {
            None
        };

        let id = from_proxy
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

        Self(id)
    }

    /// Client address as reported by a reverse proxy.
    fn forwarded_for(headers: &HeaderMap) -> Option<String> {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        forwarded.or_else(real_ip).map(str::to_string)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromRequestParts<AppState> for ClientId {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::resolve(
            &parts.headers,
            peer,
            state.config.trust_proxy_headers,
        ))
    }
}
