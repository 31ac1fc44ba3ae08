// Retry with exponential backoff
//
// Wraps a fallible async operation and re-invokes it while the error is
// classified as retryable. The final error is returned untouched so callers
// can still match on it.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Total number of invocations, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for every further retry
    #[serde(with = "crate::utils::duration_millis")]
    pub base_delay: Duration,
    /// Upper bound for a single delay
    #[serde(with = "crate::utils::optional_duration_millis")]
    pub max_delay: Option<Duration>,
    /// Scale every delay by a random factor in [0, 1)
    pub jitter: bool,
    /// Deadline for the whole retry loop, checked between attempts
    #[serde(with = "crate::utils::optional_duration_millis")]
    pub total_timeout: Option<Duration>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            base_delay: Duration::from_millis(50),
            max_delay: None,
            jitter: true,
            total_timeout: None,
        }
    }
}

impl RetryOptions {
    /// Delay before retry number `retry` (zero based), before jitter
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter {
            delay.mul_f64(rand::random::<f64>())
        } else {
            delay
        }
    }
}

/// Invoke `operation` until it succeeds, fails with a non-retryable error,
/// runs out of attempts, or would sleep past `total_timeout`.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    mut operation: F,
    is_retryable: P,
    options: &RetryOptions,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = options.max_attempts.max(1);
    let deadline = options.total_timeout.map(|timeout| Instant::now() + timeout);
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retryable(&err) {
            return Err(err);
        }

        attempt += 1;
        if attempt >= max_attempts {
            debug!("Giving up after {} attempts", attempt);
            return Err(err);
        }

        let delay = options.jittered(options.delay_for(attempt - 1));
        if let Some(deadline) = deadline {
            let wakes_in_time = Instant::now()
                .checked_add(delay)
                .map(|wake| wake <= deadline)
                .unwrap_or(false);
            if !wakes_in_time {
                debug!("Retry deadline reached after {} attempts", attempt);
                return Err(err);
            }
        }

        debug!("Attempt {} failed, retrying in {:?}", attempt, delay);
        tokio::time::sleep(delay).await;
    }
}
