//! Consumer retry with exponential backoff
//!
//! Gives event consumers a bounded number of attempts at transient failures
//! before a message is routed to the dead-letter table.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Initial backoff duration, doubled after each failed attempt
    pub initial_backoff: Duration,
    /// Cap on the exponential backoff
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Retry a fallible async operation with exponential backoff.
///
/// Returns the first success, or the last error once `max_attempts` is
/// exhausted. The `context` string only feeds log output.
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation: F,
    config: &RetryConfig,
    context: &str,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + Send,
{
    retry_with_backoff_if(operation, config, context, |_| true).await
}

/// Retry with backoff, consulting `should_retry` on every failure.
///
/// An error the predicate rejects is returned immediately without further
/// attempts — deterministic failures (validation, malformed data) gain
/// nothing from retrying and should reach the dead-letter path at once.
pub async fn retry_with_backoff_if<F, Fut, T, E, P>(
    operation: F,
    config: &RetryConfig,
    context: &str,
    should_retry: P,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + Send,
    P: Fn(&E) -> bool,
{
    let mut backoff = config.initial_backoff;

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(context, attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if !should_retry(&e) => {
                warn!(
                    context,
                    attempt,
                    error = %e,
                    "Operation failed with non-retriable error, giving up"
                );
                return Err(e);
            }
            Err(e) if attempt == config.max_attempts => {
                warn!(
                    context,
                    attempts = attempt,
                    error = %e,
                    "Operation failed after max retries"
                );
                return Err(e);
            }
            Err(e) => {
                warn!(
                    context,
                    attempt,
                    max_attempts = config.max_attempts,
                    backoff_ms = backoff.as_millis(),
                    error = %e,
                    "Operation failed, retrying with backoff"
                );
                sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, config.max_backoff);
            }
        }
    }

    unreachable!("retry loop always returns within max_attempts")
}
