//! Search-and-retry with backoff
//!
//! The render protocol never retries an action. Flows that wait on the
//! backend, such as a search that only returns results once the index has
//! caught up, repeat the whole action here with a growing delay.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::result::{ShareError, ShareResult};

/// Backoff settings for [`retry_with_backoff`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts
    pub max_attempts: usize,
    /// Base delay; multiplied before each wait
    pub initial_delay: Duration,
    /// Growth factor applied to the delay
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(2_000),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with default backoff
    #[must_use]
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Set the base delay
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the growth factor
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Delay slept after the failed attempt `attempt` (1-based)
    #[must_use]
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(self.multiplier.saturating_pow(exponent))
    }
}

/// Run `attempt` until it yields a value.
///
/// `Ok(None)` means "not yet" and triggers a wait and another attempt. An
/// error ends the loop at once.
///
/// # Errors
///
/// The first error returned by `attempt`, or
/// [`ShareError::RetriesExhausted`] when every attempt came back empty.
pub fn retry_with_backoff<T>(
    policy: &RetryPolicy,
    mut attempt: impl FnMut(usize) -> ShareResult<Option<T>>,
) -> ShareResult<T> {
    for n in 1..=policy.max_attempts {
        if let Some(value) = attempt(n)? {
            return Ok(value);
        }
        if n < policy.max_attempts {
            let delay = policy.delay_after(n);
            warn!(attempt = n, delay_ms = delay.as_millis() as u64, "no result yet, retrying");
            std::thread::sleep(delay);
        }
    }
    Err(ShareError::RetriesExhausted {
        attempts: policy.max_attempts,
    })
}
