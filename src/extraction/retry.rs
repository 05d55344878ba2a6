use crate::config::RetrySettings;
use crate::extraction::error::FetchError;
use log::{error, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Fixed-delay retry policy for provider calls.
///
/// The policy owns its retryable-error predicate so the downloader and the
/// inventory fetcher share one classification, and tests can swap it.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    retryable: fn(&FetchError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(2))
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self::fixed(settings.max_attempts, Duration::from_millis(settings.delay_ms))
    }
}

impl RetryPolicy {
    /// `max_attempts` tries in total, `delay` between consecutive tries.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            retryable: FetchError::is_retryable,
        }
    }

    pub fn with_predicate(mut self, retryable: fn(&FetchError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_retryable(&self, error: &FetchError) -> bool {
        (self.retryable)(error)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error, or
    /// the attempts are exhausted. The last error is returned.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        warn!(
                            "Operation '{}' succeeded after {} attempts",
                            operation_name, attempt
                        );
                    }
                    return Ok(result);
                }
                Err(err) if !self.is_retryable(&err) => return Err(err),
                Err(err) => {
                    if attempt >= self.max_attempts {
                        error!(
                            "Operation '{}' failed after {} attempts. Final error: {}",
                            operation_name, attempt, err
                        );
                        return Err(err);
                    }

                    warn!(
                        "Operation '{}' failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name, attempt, self.max_attempts, err, self.delay
                    );
                    sleep(self.delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient() -> FetchError {
        FetchError::MalformedPayload {
            url: "/x".into(),
            message: "truncated".into(),
        }
    }

    #[tokio::test]
    async fn test_retry_success_on_third_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::fixed(3, Duration::from_millis(5));

        let result = policy
            .run("test_operation", || {
                let attempts = attempts.clone();
                async move {
                    let current = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if current < 3 {
                        Err(transient())
                    } else {
                        Ok("success")
                    }
                }
            })
            .await;

        assert_eq!(result.ok(), Some("success"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let attempts = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::fixed(2, Duration::from_millis(5));

        let result = policy
            .run("test_operation", || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(transient())
                }
            })
            .await;

        assert!(matches!(result, Err(FetchError::MalformedPayload { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::fixed(3, Duration::from_millis(5));

        let result = policy
            .run("test_operation", || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(FetchError::NoData("/x".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(FetchError::NoData(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_predicate() {
        let attempts = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::fixed(4, Duration::from_millis(1)).with_predicate(|_| false);

        let _ = policy
            .run("test_operation", || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(transient())
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
