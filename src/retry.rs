//! Bounded exponential-backoff retry for fallible async operations

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::RetryConfig;
use crate::error::RendezvousError;

/// How often and how patiently an operation is retried
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    /// Upper bound for a single backoff delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_retries + 1,
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff_factor: config.backoff_factor,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Single attempt, never sleeps
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// `min(base_delay * backoff_factor^attempt, max_delay)`, `attempt` counted from zero
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(seconds)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, `classify` rejects the error, or attempts run out.
///
/// The last error is returned as-is so callers can still match on its kind.
pub async fn execute_with_retry<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
    classify: C,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        debug!(
            "{} (attempt {}/{})",
            operation_name,
            attempt + 1,
            max_attempts
        );

        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !classify(&err) {
                    debug!("{} failed with non-retryable error: {}", operation_name, err);
                    return Err(err);
                }

                if attempt + 1 >= max_attempts {
                    error!(
                        "{} failed after {} attempts: {}",
                        operation_name, max_attempts, err
                    );
                    return Err(err);
                }

                let backoff = policy.delay_for_attempt(attempt);
                warn!(
                    "{} failed on attempt {}: {}, retrying in {:.1}s",
                    operation_name,
                    attempt + 1,
                    err,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

/// [`execute_with_retry`] with the provider error classification
pub async fn retry_provider_call<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
) -> crate::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = crate::Result<T>>,
{
    execute_with_retry(policy, operation_name, operation, RendezvousError::is_retryable).await
}
