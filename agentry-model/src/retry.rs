//! Backoff policy for model requests.
//!
//! Only the initiation of a request is retried; once a stream has started,
//! failures are surfaced to the caller. The gateway reports failures as
//! `AgentryError::Model` messages carrying the HTTP status, so transience is
//! judged from that text.

use agentry_core::{AgentryError, Result};
use std::{future::Future, time::Duration};

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first. 1 disables retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `attempt` (1-based): doubled each time,
    /// capped at `max_delay`.
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(1u32 << attempt.saturating_sub(1).min(16))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `operation`, retrying transient failures with exponential backoff.
    pub async fn run<T, Op, Fut>(&self, mut operation: Op) -> Result<T>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < self.max_attempts && is_transient(&error) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient model error, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Whether a failure is worth retrying. Only model errors qualify: either a
/// retryable HTTP status embedded in the message, or a connection-level
/// failure that never reached the provider.
pub fn is_transient(error: &AgentryError) -> bool {
    let AgentryError::Model(message) = error else {
        return false;
    };

    let has_retryable_status = message.split(|c: char| !c.is_ascii_digit()).any(|token| {
        token.len() == 3
            && matches!(
                token.parse::<u16>(),
                Ok(408) | Ok(429) | Ok(500..=504)
            )
    });
    if has_retryable_status {
        return true;
    }

    let lowered = message.to_lowercase();
    ["rate limit", "too many requests", "timed out", "timeout", "connection reset", "connection refused"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn transient_statuses_and_keywords() {
        assert!(is_transient(&AgentryError::Model("API error: HTTP 429".into())));
        assert!(is_transient(&AgentryError::Model("gateway returned 503".into())));
        assert!(is_transient(&AgentryError::Model("connection reset by peer".into())));
        assert!(is_transient(&AgentryError::Model("request timed out".into())));

        assert!(!is_transient(&AgentryError::Model("HTTP 400 bad request".into())));
        assert!(!is_transient(&AgentryError::Model("invalid api key".into())));
        // Status-like digits inside longer numbers do not count.
        assert!(!is_transient(&AgentryError::Model("request id 142976".into())));
        // Non-model errors never retry.
        assert!(!is_transient(&AgentryError::Tool("503 unavailable".into())));
    }

    #[test]
    fn delay_doubles_up_to_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_secs(1));
        assert_eq!(policy.delay_for(9), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result = fast_policy(4)
            .run(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        return Err(AgentryError::Model("HTTP 429 rate limit".to_string()));
                    }
                    Ok("ok")
                }
            })
            .await
            .expect("succeeds after retries");

        assert_eq!(result, "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_fail_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));

        let error = fast_policy(4)
            .run(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AgentryError::Model("HTTP 401 unauthorized".to_string()))
                }
            })
            .await
            .expect_err("permanent error is not retried");

        assert!(matches!(error, AgentryError::Model(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn single_attempt_policy_never_retries() {
        let attempts = Arc::new(AtomicU32::new(0));

        let error = RetryPolicy::none()
            .run(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AgentryError::Model("HTTP 503 unavailable".to_string()))
                }
            })
            .await
            .expect_err("single attempt returns the first error");

        assert!(matches!(error, AgentryError::Model(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempts_are_capped() {
        let attempts = Arc::new(AtomicU32::new(0));

        fast_policy(3)
            .run(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AgentryError::Model("gateway returned 502".to_string()))
                }
            })
            .await
            .expect_err("exhausts attempts");

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
