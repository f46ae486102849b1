//! Bearer-token acquisition
//!
//! The only retried operation of a run: one initial attempt, then a bounded
//! number of retries with a fixed backoff.

use crate::error::AuthError;
use async_trait::async_trait;
use std::time::Duration;

/// Source of bearer tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Request a fresh token
    async fn fetch_token(&self) -> Result<String, AuthError>;
}

/// Retry schedule for token acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub retries: u32,
    /// Pause before each retry
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Total number of attempts
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }
}

/// Obtain a token, retrying per `policy`
pub async fn acquire_token(
    provider: &dyn TokenProvider,
    policy: RetryPolicy,
) -> Result<String, AuthError> {
    tracing::info!("Requesting bearer token");
    let mut attempt = 1;
    loop {
        match provider.fetch_token().await {
            Ok(token) => {
                tracing::info!(attempt, "Bearer token received");
                return Ok(token);
            }
            Err(e) if attempt < policy.attempts() => {
                tracing::warn!(attempt, error = %e, "Could not get bearer token, retrying");
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempts = attempt, error = %e, "Bearer token retry limit reached");
                return Err(AuthError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(e),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl TokenProvider for FlakyProvider {
        async fn fetch_token(&self) -> Result<String, AuthError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(AuthError::MissingToken)
            } else {
                Ok("token".to_string())
            }
        }
    }

    fn provider(failures: u32) -> FlakyProvider {
        FlakyProvider {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            retries: 3,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn first_attempt_succeeds() {
        let provider = provider(0);
        assert_eq!(acquire_token(&provider, fast()).await.unwrap(), "token");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_within_retry_budget() {
        let provider = provider(3);
        assert_eq!(acquire_token(&provider, fast()).await.unwrap(), "token");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let provider = provider(10);
        let err = acquire_token(&provider, fast()).await.unwrap_err();
        assert!(matches!(err, AuthError::RetriesExhausted { attempts: 4, .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn default_policy_backs_off_one_second() {
        let provider = provider(2);
        let started = tokio::time::Instant::now();
        acquire_token(&provider, RetryPolicy::default()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
