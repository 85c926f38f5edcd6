//! Retry and backoff policy for the fetcher.

use std::time::Duration;

use rand::Rng;

use crate::user_agent::PacingWindow;

/// Bounded exponential backoff with additive jitter.
///
/// The delay before retry `n` (0-based) is `base_delay * 2^n`, capped at
/// `max_delay`, plus a uniform jitter in `[0, max_jitter]`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
    pub pacing: PacingWindow,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_jitter: Duration::from_millis(500),
            pacing: PacingWindow::default(),
        }
    }
}

impl RetryPolicy {
    /// A policy with no sleeping at all. Used by tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
            pacing: PacingWindow::DISABLED,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Backoff without jitter for the given 0-based retry.
    pub fn backoff(&self, attempt: u32, base_delay: Duration) -> Duration {
        let shift = attempt.min(30);
        let exp = base_delay.saturating_mul(1u32 << shift);
        exp.min(self.max_delay.max(base_delay))
    }

    /// Backoff plus random jitter.
    pub fn delay_for_attempt(&self, attempt: u32, base_delay: Duration) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        self.backoff(attempt, base_delay) + jitter
    }
}
