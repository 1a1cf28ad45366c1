//! Retry with exponential backoff for transient registry failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{Result, WatchError};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: usize,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on the delay between retries.
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Scale each delay by a random factor in [0.5, 1.0).
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        // powi overflow guard
        let safe_attempt = attempt.min(20) as i32;

        let base_delay = self.initial_delay.as_millis() as f64 * self.multiplier.powi(safe_attempt);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            let mut rng = rand::thread_rng();
            capped_delay * rng.gen_range(0.5..1.0)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Whether an error is worth another attempt.
pub fn is_retryable(error: &WatchError) -> bool {
    match error {
        WatchError::Timeout(_) => true,
        WatchError::Io(_) => true,
        WatchError::WhoisError(msg) => {
            let lower = msg.to_lowercase();
            lower.contains("connect")
                || lower.contains("timed out")
                || lower.contains("refused")
                || lower.contains("reset")
        }
        _ => false,
    }
}

/// Runs an async operation until it succeeds, fails permanently, or the
/// policy runs out of attempts.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    let attempts_remaining = self.policy.max_attempts.saturating_sub(attempt + 1);

                    if !is_retryable(&e) || attempts_remaining == 0 {
                        if attempt == 0 {
                            return Err(e);
                        }
                        warn!(
                            attempt = attempt + 1,
                            max_attempts = self.policy.max_attempts,
                            error = %e,
                            "Operation failed after retries"
                        );
                        return Err(WatchError::RetryExhausted {
                            attempts: attempt + 1,
                            last_error: e.to_string(),
                        });
                    }

                    let delay = self.policy.delay_for_attempt(attempt);
                    debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
