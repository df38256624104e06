//! Retry helper for provider queries
//!
//! Provider APIs fail transiently (rate limits, overloaded origins, flaky
//! CDNs), so search and detail queries are retried a bounded number of times.
//! Every failure is retried; the first success ends the loop.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::ProbeError;
use crate::utils::jitter::generate_jitter_percent;

/// Retry policy for a single probe step
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
    /// Add up to 25% jitter to the pause
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(200),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            jitter: true,
        }
    }
}

/// Outcome of a retried operation together with the number of attempts spent
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, ProbeError>,
    pub attempts: u32,
}

/// Run `operation` until it succeeds or `max_attempts` is exhausted
///
/// Returns the last error when every attempt failed.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
    operation_name: &str,
) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProbeError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        "Probe step '{}' succeeded on attempt {}/{}",
                        operation_name, attempt, max_attempts
                    );
                }
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) if attempt < max_attempts => {
                let delay = calculate_delay(config);
                warn!(
                    "Probe step '{}' failed on attempt {}/{}, retrying in {:?}: {}",
                    operation_name, attempt, max_attempts, delay, err
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(
                    "Probe step '{}' failed after {} attempts: {}",
                    operation_name, max_attempts, err
                );
                return Attempted {
                    result: Err(err),
                    attempts: attempt,
                };
            }
        }
    }
}

fn calculate_delay(config: &RetryConfig) -> Duration {
    let delay_ms = config.delay.as_millis() as u64;
    if config.jitter {
        Duration::from_millis(delay_ms + generate_jitter_percent(delay_ms, 25))
    } else {
        Duration::from_millis(delay_ms)
    }
}
