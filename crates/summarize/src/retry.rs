//! Retry with exponential backoff for transient summarizer failures.
//!
//! Delays double per attempt from `base_delay`, are capped at `max_delay`,
//! and optionally get 0-50% random jitter so concurrent windows that fail
//! together do not retry in lockstep.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Outcome of a retried operation.
#[derive(Debug, Clone)]
pub struct RetryResult<T, E> {
    pub result: Result<T, E>,
    /// Attempts made, 1 when the first call succeeded or failed permanently.
    pub attempts: u32,
    pub total_duration: Duration,
}

impl<T, E> RetryResult<T, E> {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Runs `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or the retry budget runs out. The attempt number (starting at 0)
/// is passed to each call.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    config: &RetryConfig,
    is_retryable: R,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let start = Instant::now();
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                };
            }
            Err(error) if attempt < config.max_retries && is_retryable(&error) => {
                let delay = calculate_delay(config, attempt);
                debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retry_scheduled"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                return RetryResult {
                    result: Err(error),
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                };
            }
        }
    }
}

fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config.base_delay.as_millis() as u64;
    let exponential = base.saturating_mul(2_u64.saturating_pow(attempt));
    let delay = exponential.min(config.max_delay.as_millis() as u64);

    if config.jitter {
        let jitter = fastrand::u64(0..=delay / 2);
        Duration::from_millis(delay + jitter)
    } else {
        Duration::from_millis(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(max_retries)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[tokio::test]
    async fn retry_succeeds_eventually() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            &fast_config(3),
            |_: &String| true,
            |_attempt| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("not yet".to_string())
                    } else {
                        Ok("success")
                    }
                }
            },
        )
        .await;

        assert!(result.succeeded());
        assert_eq!(result.attempts, 3);
        assert_eq!(result.into_result().unwrap(), "success");
    }

    #[tokio::test]
    async fn retry_gives_up_after_budget() {
        let result: RetryResult<(), String> = retry_with_backoff(
            &fast_config(2),
            |_| true,
            |_| async { Err("always fails".to_string()) },
        )
        .await;

        assert!(!result.succeeded());
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let result: RetryResult<(), String> = retry_with_backoff(
            &fast_config(5),
            |e: &String| !e.contains("401"),
            |_| async { Err("HTTP 401".to_string()) },
        )
        .await;

        assert_eq!(result.attempts, 1);
        assert_eq!(result.into_result().unwrap_err(), "HTTP 401");
    }

    #[test]
    fn delay_doubles_and_caps() {
        let cfg = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(350))
            .with_jitter(false);
        assert_eq!(calculate_delay(&cfg, 0), Duration::from_millis(100));
        assert_eq!(calculate_delay(&cfg, 1), Duration::from_millis(200));
        assert_eq!(calculate_delay(&cfg, 2), Duration::from_millis(350));
        assert_eq!(calculate_delay(&cfg, 40), Duration::from_millis(350));
    }

    #[test]
    fn jitter_stays_within_half_delay() {
        let cfg = RetryConfig::default().with_base_delay(Duration::from_millis(100));
        for _ in 0..50 {
            let delay = calculate_delay(&cfg, 0);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }
}
