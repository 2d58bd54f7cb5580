//! Retry with exponential backoff
//!
//! Generic retry helper for transient failures (network blips, 5xx from a
//! webhook receiver, mapping-provider hiccups). The caller decides which
//! errors are worth retrying.

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_multiplier: f64,
    /// Maximum delay between retries (cap).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Webhook delivery schedule: 1s, 2s, 4s, ...
    pub fn webhook(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Execute an async operation with exponential backoff retry.
///
/// The `should_retry` closure determines whether a given error is transient
/// (and therefore retryable) or permanent (bail immediately).
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: RetryConfig,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
    operation_name: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if attempt == config.max_attempts || !should_retry(&err) {
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = config.max_attempts,
                        error = %err,
                        "Operation failed permanently"
                    );
                    return Err(err);
                }

                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = config.max_attempts,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "Transient failure, retrying"
                );

                tokio::time::sleep(delay).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_multiplier)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }

    unreachable!("Loop exits via return")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = retry_with_backoff(
            RetryConfig {
                max_attempts: 5,
                initial_delay: Duration::from_millis(1),
                backoff_multiplier: 2.0,
                max_delay: Duration::from_millis(10),
            },
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("permanent") }
            },
            |_| false,
            "test",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(
            RetryConfig {
                max_attempts: 5,
                initial_delay: Duration::from_millis(1),
                backoff_multiplier: 2.0,
                max_delay: Duration::from_millis(10),
            },
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient")
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| true,
            "test",
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
