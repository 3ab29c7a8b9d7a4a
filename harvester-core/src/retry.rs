use crate::{CoreError, ErrorExt, ErrorKind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(3);

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `base_delay * n` before the next try
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Linear backoff: the wait after failed attempt `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Retry strategy based on error type
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Back off and try again
    Retry,
    /// Give up immediately
    NoRetry,
}

/// Only transient remote failures are worth another attempt.
pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    match error.kind() {
        ErrorKind::TransientRemote => RetryStrategy::Retry,
        ErrorKind::NonTransientRemote | ErrorKind::LocalIo | ErrorKind::Configuration => {
            RetryStrategy::NoRetry
        }
    }
}

/// Wait note for the retry warning. Backoff stays linear; a server hint
/// such as a 429 `retry-after` is only reported next to it.
fn backoff_note(delay: Duration, error: &CoreError) -> String {
    match error.retry_after() {
        Some(hint) => format!("Sleeping {:?} (server suggested {:?})", delay, hint),
        None => format!("Sleeping {:?}", delay),
    }
}

/// Retry metrics for monitoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryMetrics {
    pub total_retries: u64,
    pub successful_retries: u64,
    pub exhausted_operations: u64,
}

/// Wraps remote calls with bounded linear backoff.
#[derive(Debug, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
    total_retries: AtomicU64,
    successful_retries: AtomicU64,
    exhausted_operations: AtomicU64,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `operation` until it succeeds, fails with a non-transient error,
    /// or `max_attempts` attempts have failed transiently. Exhaustion is
    /// reported as [`CoreError::RetriesExhausted`].
    pub async fn execute<F, Fut, T>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        self.successful_retries.fetch_add(1, Ordering::Relaxed);
                        info!(
                            "Operation {} succeeded after {} retries",
                            operation_name,
                            attempt - 1
                        );
                    }
                    return Ok(result);
                }
                Err(error) => {
                    debug!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt, max_attempts, operation_name, error
                    );

                    if get_retry_strategy(&error) == RetryStrategy::NoRetry {
                        error!(
                            "Unexpected error during {}, not retrying: {}",
                            operation_name, error
                        );
                        return Err(error);
                    }

                    if attempt >= max_attempts {
                        self.exhausted_operations.fetch_add(1, Ordering::Relaxed);
                        error!(
                            "Operation {} failed after {} attempts: {}",
                            operation_name, attempt, error
                        );
                        return Err(CoreError::RetriesExhausted {
                            operation: operation_name.to_string(),
                            attempts: attempt,
                            last_error: Box::new(error),
                        });
                    }

                    let delay = self.config.delay_for_attempt(attempt);
                    warn!(
                        "{} during {}. {} (attempt {}/{})",
                        error,
                        operation_name,
                        backoff_note(delay, &error),
                        attempt,
                        max_attempts
                    );
                    self.total_retries.fetch_add(1, Ordering::Relaxed);
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Get current retry metrics
    pub fn get_metrics(&self) -> RetryMetrics {
        RetryMetrics {
            total_retries: self.total_retries.load(Ordering::Relaxed),
            successful_retries: self.successful_retries.load(Ordering::Relaxed),
            exhausted_operations: self.exhausted_operations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigError, RedditApiError};
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_retry_config_clamps_zero_attempts() {
        let config = RetryConfig::new(0, Duration::from_secs(1));
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn test_linear_backoff_calculation() {
        let config = RetryConfig::new(5, Duration::from_secs(3));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(3));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(6));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(9));
    }

    #[test]
    fn test_backoff_note_reports_server_hint() {
        let rate_limited =
            CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 42 });
        assert_eq!(
            backoff_note(Duration::from_secs(6), &rate_limited),
            "Sleeping 6s (server suggested 42s)"
        );

        let server_error = CoreError::RedditApi(RedditApiError::ServerError { status_code: 502 });
        assert_eq!(
            backoff_note(Duration::from_secs(6), &server_error),
            "Sleeping 6s"
        );
    }

    #[test]
    fn test_retry_strategy_for_errors() {
        let rate_limit_error =
            CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
        assert_eq!(get_retry_strategy(&rate_limit_error), RetryStrategy::Retry);

        let server_error = CoreError::RedditApi(RedditApiError::ServerError { status_code: 503 });
        assert_eq!(get_retry_strategy(&server_error), RetryStrategy::Retry);

        let auth_error = CoreError::RedditApi(RedditApiError::AuthenticationFailed {
            reason: "Invalid token".to_string(),
        });
        assert_eq!(get_retry_strategy(&auth_error), RetryStrategy::NoRetry);

        let config_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
            var_name: "CLIENT_ID".to_string(),
        });
        assert_eq!(get_retry_strategy(&config_error), RetryStrategy::NoRetry);
    }

    #[tokio::test]
    async fn test_retry_executor_success_on_first_attempt() {
        let executor = RetryExecutor::new(fast_config(3));

        let result = executor
            .execute("test_operation", || async { Ok::<i32, CoreError>(42) })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(executor.get_metrics(), RetryMetrics::default());
    }

    #[tokio::test]
    async fn test_retry_executor_success_after_retries() {
        let executor = RetryExecutor::new(fast_config(3));
        let attempts = Arc::new(AtomicU32::new(0));

        let result = executor
            .execute("test_operation", || {
                let attempts = attempts.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(CoreError::RedditApi(RedditApiError::ServerError {
                            status_code: 500,
                        }))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let metrics = executor.get_metrics();
        assert_eq!(metrics.total_retries, 2);
        assert_eq!(metrics.successful_retries, 1);
    }

    #[tokio::test]
    async fn test_retry_executor_exhausts_on_persistent_rate_limit() {
        let executor = RetryExecutor::new(fast_config(4));
        let attempts = Arc::new(AtomicU32::new(0));

        let result = executor
            .execute("post search", || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, CoreError>(CoreError::RedditApi(
                        RedditApiError::RateLimitExceeded { retry_after: 1 },
                    ))
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        match result {
            Err(CoreError::RetriesExhausted {
                operation,
                attempts,
                last_error,
            }) => {
                assert_eq!(operation, "post search");
                assert_eq!(attempts, 4);
                assert!(matches!(
                    *last_error,
                    CoreError::RedditApi(RedditApiError::RateLimitExceeded { .. })
                ));
            }
            other => panic!("Expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(executor.get_metrics().exhausted_operations, 1);
    }

    #[tokio::test]
    async fn test_retry_executor_no_retry_on_auth_error() {
        let executor = RetryExecutor::new(fast_config(3));
        let attempts = Arc::new(AtomicU32::new(0));

        let result = executor
            .execute("test_operation", || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, CoreError>(CoreError::RedditApi(RedditApiError::Forbidden {
                        resource: "/r/private/search".to_string(),
                    }))
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(CoreError::RedditApi(RedditApiError::Forbidden { .. }))
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(executor.get_metrics().total_retries, 0);
    }
}
