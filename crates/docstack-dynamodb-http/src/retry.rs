//! Bounded retry with exponential backoff.

use std::time::Duration;

use docstack_core::DocstackConfig;

/// Upper bound on a single backoff delay.
const MAX_DELAY: Duration = Duration::from_secs(5);

/// How many times a retryable failure is attempted and how long to wait
/// between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; `0` behaves like `1`.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for every further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Never retry.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Policy from `max_attempts` and `retry_base_delay_ms`.
    #[must_use]
    pub fn from_config(config: &DocstackConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Attempts allowed, at least one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(MAX_DELAY)
    }
}
