//! Attempt budget and linear backoff for gateway calls.
//!
//! Attempt `n` (1-based) that fails is followed by a wait of
//! `n * delay_step` before attempt `n + 1`. No wait follows the last
//! attempt.

use std::time::Duration;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default backoff step (1.5 s, 3.0 s, ...).
pub const DEFAULT_DELAY_STEP: Duration = Duration::from_millis(1500);

/// Tunable parameters for the linear-backoff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    /// Backoff increment per completed attempt.
    pub delay_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay_step: DEFAULT_DELAY_STEP,
        }
    }
}

impl RetryPolicy {
    /// Total number of attempts, first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait after failed attempt `attempt` (1-based), or `None` after the last.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts() {
            return None;
        }
        Some(self.delay_step.saturating_mul(attempt))
    }

    /// Sum of all waits when every attempt fails.
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts())
            .filter_map(|attempt| self.delay_after(attempt))
            .sum()
    }
}
