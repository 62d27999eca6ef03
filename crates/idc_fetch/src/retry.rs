//! Retry of throttled calls with exponential backoff.

use std::future::Future;

use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::{FetchError, FetchResult};

/// Run `call` until it succeeds, fails with a non-throttling error, or the
/// policy runs out of attempts.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut call: F) -> FetchResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let mut attempt = 1;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_throttled() => {
                if attempt >= policy.max_attempts {
                    warn!("{} still throttled after {} attempt(s)", operation, attempt);
                    return Err(FetchError::Throttled {
                        operation: operation.to_string(),
                        attempts: attempt,
                    });
                }

                let delay = policy.delay_for(attempt);
                debug!(
                    "{} throttled (attempt {}), retrying in {:?}",
                    operation, attempt, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default()
            .base_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(2))
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_policy(), "op", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(FetchError::throttled("op"))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: FetchResult<()> = with_retry(&fast_policy(), "op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Auth("expired".to_string()))
        })
        .await;

        assert!(result.unwrap_err().is_auth());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts() {
        let result: FetchResult<()> = with_retry(&fast_policy().max_attempts(3), "list_users", || async {
            Err(FetchError::throttled("list_users"))
        })
        .await;

        match result {
            Err(FetchError::Throttled { operation, attempts }) => {
                assert_eq!(operation, "list_users");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
