//! Retry policy with exponential backoff for model requests

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::models::RetryConfig;
use crate::domain::ports::ModelError;

/// Retry policy for transient model errors
///
/// Backoff doubles with each attempt and is capped at the configured
/// maximum. Permanent errors (schema violations, client-side HTTP
/// failures, missing credentials) are returned immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Initial backoff duration in milliseconds
    initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds
    max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Create a new retry policy
    #[must_use]
    pub const fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Build a policy from the retry section of the configuration
    #[must_use]
    pub const fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }

    /// Execute an operation, retrying transient failures with backoff
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted, or the first
    /// permanent error encountered.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ModelError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ModelError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if self.should_retry(&err, attempt) {
                        let backoff = self.calculate_backoff(attempt);
                        warn!(
                            "attempt {} failed with transient error: {}. retrying in {:?}",
                            attempt + 1,
                            err,
                            backoff
                        );

                        sleep(backoff).await;
                        attempt += 1;
                    } else {
                        if attempt >= self.max_retries && err.is_transient() {
                            warn!("operation failed after {} attempts: {}", attempt + 1, err);
                        } else {
                            debug!("permanent error, not retrying: {}", err);
                        }
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Backoff for a given attempt: min(initial * 2^attempt, max)
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }

    fn should_retry(&self, error: &ModelError, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }

        error.is_transient()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::new(5, 1000, 60_000);

        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(4000));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(8000));
        assert_eq!(policy.calculate_backoff(6), Duration::from_millis(60_000));
        assert_eq!(policy.calculate_backoff(7), Duration::from_millis(60_000));
    }

    #[test]
    fn test_should_retry_transient_errors() {
        let policy = RetryPolicy::new(3, 1000, 60_000);

        assert!(policy.should_retry(&ModelError::Transient("rate limited".into()), 0));
        assert!(policy.should_retry(&ModelError::Transient("connect reset".into()), 2));
    }

    #[test]
    fn test_should_not_retry_permanent_errors() {
        let policy = RetryPolicy::new(3, 1000, 60_000);

        assert!(!policy.should_retry(&ModelError::MissingApiKey("OPENAI_API_KEY".into()), 0));
        assert!(!policy.should_retry(&ModelError::SchemaViolation("garbled".into()), 0));
        assert!(!policy.should_retry(&ModelError::Http("400 bad request".into()), 0));
    }

    #[test]
    fn test_should_not_retry_after_max_attempts() {
        let policy = RetryPolicy::new(3, 1000, 60_000);

        assert!(!policy.should_retry(&ModelError::Transient("rate limited".into()), 3));
        assert!(!policy.should_retry(&ModelError::Transient("rate limited".into()), 4));
    }

    #[tokio::test]
    async fn test_execute_succeeds_immediately() {
        let policy = RetryPolicy::new(3, 10, 100);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<i32, ModelError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_retries_on_transient_error() {
        let policy = RetryPolicy::new(3, 10, 100);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    let attempt = calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(ModelError::Transient("overloaded".into()))
                    } else {
                        Ok::<i32, ModelError>(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_fails_on_permanent_error() {
        let policy = RetryPolicy::new(3, 10, 100);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, ModelError>(ModelError::SchemaViolation("not json".into()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_fails_after_max_retries() {
        let policy = RetryPolicy::new(2, 10, 100);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, ModelError>(ModelError::Transient("overloaded".into()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
