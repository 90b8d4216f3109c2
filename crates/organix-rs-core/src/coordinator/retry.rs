//! Bounded retry with exponential backoff for provider calls.

use async_trait::async_trait;
use log::warn;
use organix_rs_config::RetryConfig;
use organix_rs_protocol::{ChatProvider, ChatRequest, ProviderError};
use std::future::Future;
use std::time::Duration;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// A chat provider with a per-attempt timeout and the retry policy applied
/// to every completion.
pub(crate) struct BoundedProvider<'a> {
    pub(crate) llm: &'a dyn ChatProvider,
    pub(crate) retry: &'a RetryConfig,
    pub(crate) timeout_ms: u64,
}

#[async_trait]
impl ChatProvider for BoundedProvider<'_> {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let llm = self.llm;
        let timeout_ms = self.timeout_ms;
        let timeout = Duration::from_millis(timeout_ms);
        with_retry(self.retry, "complete", || async move {
            match tokio::time::timeout(timeout, llm.complete(request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(timeout_ms)),
            }
        })
        .await
    }
}

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryConfig,
    operation: &str,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut backoff = Duration::from_millis(policy.initial_backoff_ms);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < attempts => {
                warn!(
                    "retrying provider call (operation={}, attempt={}, backoff_ms={}, error={})",
                    operation,
                    attempt,
                    backoff.as_millis(),
                    err
                );
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff, policy.multiplier);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Upper bound on the time spent sleeping between `attempts` calls.
///
/// Once the schedule stops growing (at the cap, or with a multiplier of 1)
/// every remaining sleep is the same, so the tail is added in one step.
pub(crate) fn total_backoff(policy: &RetryConfig) -> Duration {
    let mut backoff = Duration::from_millis(policy.initial_backoff_ms);
    let mut total = Duration::ZERO;
    let mut remaining = policy.max_attempts.saturating_sub(1);
    while remaining > 0 {
        let next = next_backoff(backoff, policy.multiplier);
        total = total.saturating_add(backoff);
        remaining -= 1;
        if next == backoff {
            break;
        }
        backoff = next;
    }
    total.saturating_add(backoff.saturating_mul(remaining))
}

fn next_backoff(current: Duration, multiplier: f32) -> Duration {
    let scaled = current.as_secs_f64() * f64::from(multiplier).max(1.0);
    Duration::from_secs_f64(scaled.min(MAX_BACKOFF.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::{total_backoff, with_retry};
    use organix_rs_config::RetryConfig;
    use organix_rs_protocol::ProviderError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_policy(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_backoff_ms: 1,
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = &AtomicU32::new(0);
        let result = with_retry(&fast_policy(3), "test", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::Transient("busy".to_string()))
            } else {
                Ok("done")
            }
        })
        .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn auth_errors_fail_immediately() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_policy(5), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Auth("bad key".to_string()))
        })
        .await;
        assert_eq!(result, Err(ProviderError::Auth("bad key".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_policy(2), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Timeout(5))
        })
        .await;
        assert_eq!(result, Err(ProviderError::Timeout(5)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn total_backoff_sums_the_schedule() {
        let policy = RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 100,
            multiplier: 2.0,
        };
        assert_eq!(total_backoff(&policy), Duration::from_millis(300));
        assert_eq!(total_backoff(&RetryConfig::none()), Duration::ZERO);
    }

    #[test]
    fn total_backoff_is_capped_per_sleep() {
        let policy = RetryConfig {
            max_attempts: u32::MAX,
            initial_backoff_ms: 1_000,
            multiplier: 2.0,
        };
        // 1 + 2 + 4 + 8 + 16 seconds, then 30s for each remaining sleep
        let expected = Duration::from_secs(31) + Duration::from_secs(30) * (u32::MAX - 6);
        assert_eq!(total_backoff(&policy), expected);

        let flat = RetryConfig {
            max_attempts: u32::MAX,
            initial_backoff_ms: 0,
            multiplier: 1.0,
        };
        assert_eq!(total_backoff(&flat), Duration::ZERO);
    }
}
