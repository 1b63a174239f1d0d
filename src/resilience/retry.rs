//! `with_retry`: retry a fallible async operation with fixed, linear, or
//! exponential backoff, capped at 30 seconds between attempts.
//!
//! Only [`WalletError::is_retryable`] errors are retried; anything else is
//! returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::{ErrorCode, WalletError};

const MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    Fixed,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub policy: BackoffPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(200), policy: BackoffPolicy::Exponential }
    }
}

impl RetryConfig {
    /// Delay before the given 1-indexed attempt number, capped at
    /// [`MAX_DELAY`].
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = match self.policy {
            BackoffPolicy::Fixed => self.base_delay,
            BackoffPolicy::Linear => self.base_delay * attempt,
            BackoffPolicy::Exponential => self.base_delay.saturating_mul(1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX)),
        };
        delay.min(MAX_DELAY)
    }
}

/// Run `op`, retrying on retryable errors per `config`. `on_retry` is
/// invoked with the attempt number (1-indexed) and the delay before the
/// next try, after every failed attempt that will be retried.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut op: F, mut on_retry: impl FnMut(u32, Duration)) -> Result<T, WalletError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WalletError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < config.max_attempts && err.is_retryable() => {
                let delay = config.delay_for_attempt(attempt);
                on_retry(attempt, delay);
                tokio::time::sleep(delay).await;
            }
            Err(err) if err.is_retryable() => {
                return Err(WalletError::all_attempts_failed(format!(
                    "all {} attempts failed; last error: {}",
                    config.max_attempts, err.message
                ))
                .with_context(err.context));
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn exponential_delay_doubles_and_caps() {
        let config = RetryConfig { max_attempts: 10, base_delay: Duration::from_secs(1), policy: BackoffPolicy::Exponential };
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(10), MAX_DELAY);
    }

    #[test]
    fn linear_delay_scales_with_attempt() {
        let config = RetryConfig { max_attempts: 5, base_delay: Duration::from_secs(2), policy: BackoffPolicy::Linear };
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(6));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures_with_exactly_n_retries() {
        let attempts = AtomicU32::new(0);
        let retries = AtomicU32::new(0);
        let mut seen_delays = Vec::new();

        let config = RetryConfig { max_attempts: 4, base_delay: Duration::from_millis(1), policy: BackoffPolicy::Exponential };

        let result = with_retry(
            config,
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        Err(WalletError::network_error("transient"))
                    } else {
                        Ok(42)
                    }
                }
            },
            |_attempt, delay| {
                retries.fetch_add(1, Ordering::SeqCst);
                seen_delays.push(delay);
            },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(retries.load(Ordering::SeqCst), 3);
        assert!(seen_delays.windows(2).all(|w| w[1] >= w[0]));
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig::default();

        let result: Result<(), _> = with_retry(
            config,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(WalletError::invalid_parameters("bad input")) }
            },
            |_, _| panic!("should not retry"),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_attempts_reports_all_attempts_failed() {
        let config = RetryConfig { max_attempts: 2, base_delay: Duration::from_millis(1), policy: BackoffPolicy::Fixed };

        let result: Result<(), _> = with_retry(config, || async { Err(WalletError::rpc_error("down")) }, |_, _| {}).await;

        assert_eq!(result.unwrap_err().code, ErrorCode::AllAttemptsFailed);
    }
}
