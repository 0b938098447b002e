//! Retry policy for transient failures

use std::time::Duration;

use crate::error::ApiError;

/// Bounded retry with exponential backoff.
///
/// The send loop consults the policy after each failed attempt; the
/// attempt counter is threaded through the loop explicitly rather than
/// stored on the request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the initial try
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `base * 2^(n-1)`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Whether a failure should be retried given the retries used so far
    pub fn should_retry(&self, err: &ApiError, retries_so_far: u32) -> bool {
        err.is_transient() && retries_so_far < self.max_retries
    }

    /// Backoff delay before retry attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}
