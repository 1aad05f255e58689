//! Per-client sliding-window request limiter.
//!
//! [`InMemoryRateGuard`] keeps, for each client identifier, the instants of
//! the requests it admitted during the trailing window. The [`RateGuard`]
//! trait is the seam for swapping in a shared counting store when several
//! instances sit behind a load balancer.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::CoreError;

/// Default number of requests a client may make per window.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 30;

/// Length of the sliding window.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Idle entries are only swept once the map holds this many clients.
const SWEEP_THRESHOLD: usize = 1024;

/// Minimum number of checks between two sweeps.
const SWEEP_INTERVAL: u32 = 256;

/// Rejection returned when a client has used up its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Rate limit exceeded, retry after {}s", .retry_after.as_secs())]
pub struct RateLimitExceeded {
    /// Time until the oldest admitted request leaves the window.
    pub retry_after: Duration,
}

impl From<RateLimitExceeded> for CoreError {
    fn from(err: RateLimitExceeded) -> Self {
        CoreError::RateLimited {
            retry_after: err.retry_after,
        }
    }
}

/// Gatekeeper consulted before each annotation request.
#[async_trait]
pub trait RateGuard: Send + Sync {
    /// Admit one request for `client_id`, or reject it.
    async fn admit(&self, client_id: &str) -> Result<(), RateLimitExceeded>;
}

/// Process-local [`RateGuard`] backed by a mutex-protected map.
///
/// All clients share one lock; the critical section is a prune, a compare
/// and a push, so contention stays negligible.
#[derive(Debug)]
pub struct InMemoryRateGuard {
    limit: u32,
    window: Duration,
    windows: Mutex<ClientWindows>,
}

/// Admission timestamps per client, plus the sweep bookkeeping.
#[derive(Debug, Default)]
struct ClientWindows {
    clients: HashMap<String, VecDeque<Instant>>,
    checks_since_sweep: u32,
}

impl ClientWindows {
    /// Drop clients with nothing left in the window, at most once per
    /// [`SWEEP_INTERVAL`] checks so a crowd of live clients cannot turn every
    /// check into a full scan.
    fn maybe_sweep(&mut self, now: Instant, window: Duration) {
        self.checks_since_sweep = self.checks_since_sweep.saturating_add(1);
        if self.clients.len() < SWEEP_THRESHOLD || self.checks_since_sweep < SWEEP_INTERVAL {
            return;
        }
        self.checks_since_sweep = 0;
        self.clients.retain(|_, stamps| {
            stamps
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) < window)
        });
    }
}

impl InMemoryRateGuard {
    /// Create a guard admitting `limit` requests per [`RATE_WINDOW`].
    ///
    /// A limit of `0` disables throttling.
    pub fn new(limit: u32) -> Self {
        Self::with_window(limit, RATE_WINDOW)
    }

    /// Create a guard with a custom window length.
    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(ClientWindows::default()),
        }
    }

    /// Admit or reject a request for `client_id` as of `now`.
    pub fn admit_at(&self, client_id: &str, now: Instant) -> Result<(), RateLimitExceeded> {
        if self.limit == 0 {
            return Ok(());
        }

        // A poisoned lock only means another request panicked mid-update;
        // the timestamps themselves are still usable.
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        windows.maybe_sweep(now, self.window);

        let stamps = windows.clients.entry(client_id.to_string()).or_default();
        while let Some(oldest) = stamps.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                stamps.pop_front();
            } else {
                break;
            }
        }

        if stamps.len() >= self.limit as usize {
            let retry_after = stamps
                .front()
                .map(|oldest| self.window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(self.window);
            return Err(RateLimitExceeded { retry_after });
        }

        stamps.push_back(now);
        Ok(())
    }

    /// Number of requests currently counted against `client_id`, as of `now`.
    pub fn in_window(&self, client_id: &str, now: Instant) -> usize {
        let windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        windows
            .clients
            .get(client_id)
            .map(|stamps| {
                stamps
                    .iter()
                    .filter(|at| now.saturating_duration_since(**at) < self.window)
                    .count()
            })
            .unwrap_or(0)
    }
}

impl Default for InMemoryRateGuard {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_MINUTE)
    }
}

#[async_trait]
impl RateGuard for InMemoryRateGuard {
    async fn admit(&self, client_id: &str) -> Result<(), RateLimitExceeded> {
        self.admit_at(client_id, Instant::now())
    }
}
