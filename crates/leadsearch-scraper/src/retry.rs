//! Retry and backoff policy for fetch attempts.
//!
//! Transient errors (timeouts, upstream 5xx) are retried with exponential
//! backoff; everything else is propagated immediately. The policy is an
//! explicit configuration structure so it can be tested without network I/O.

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// What to do when an interactive challenge is detected.
///
/// Only `Skip` exists: challenges are never solved, the source's remaining
/// pages are abandoned. The variant is here so the policy structure states
/// the decision explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptchaPolicy {
    #[default]
    Skip,
}

/// Retry configuration shared by the orchestrator and its tests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure. `0` disables retries.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Delay before retry n is `base_delay * multiplier^(n-1)`.
    pub backoff_multiplier: f64,
    pub captcha_policy: CaptchaPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            captcha_policy: CaptchaPolicy::Skip,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before the retry with 0-based index `attempt`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        self.base_delay.mul_f64(factor.max(0.0))
    }
}

/// Executes `operation` with retries on transient [`FetchError`]s.
///
/// On a transient error the function sleeps per the policy's backoff schedule
/// and tries again, up to `max_attempts` additional attempts. Non-transient
/// errors and exhausted retries return the last error.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= policy.max_attempts {
                    return Err(err);
                }
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient fetch error, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
