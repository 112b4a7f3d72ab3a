//! Shared HTTP retry policy for inference calls
//!
//! Every stage is bound to the same policy. Delay before retry `n` (1-based)
//! is `initial_delay * exp_base^(n-1)`, capped at `max_delay`.

use crate::llm::provider::LlmError;
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub attempts: u32,
    pub initial_delay: Duration,
    pub exp_base: f64,
    pub max_delay: Duration,
    pub retryable_status_codes: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_delay: Duration::from_secs(1),
            exp_base: 2.0,
            max_delay: Duration::from_secs(60),
            retryable_status_codes: [429, 500, 503, 504].into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    /// Same status set and attempt count, no sleeping between attempts
    pub fn without_delay(mut self) -> Self {
        self.initial_delay = Duration::ZERO;
        self
    }

    /// Backoff before retry number `retry` (the first retry is 1)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 || self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.exp_base.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Whether an error is transient under this policy
    pub fn is_retryable(&self, error: &LlmError) -> bool {
        match error {
            LlmError::HttpStatus { status, .. } => self.retryable_status_codes.contains(status),
            LlmError::NetworkError(_) => true,
            _ => false,
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// ceiling is reached. The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, LlmError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let attempts = self.attempts.max(1);

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.delay_for_retry(attempt - 1);
                debug!(
                    label = label,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying inference call"
                );
                tokio::time::sleep(delay).await;
            }

            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(label = label, attempt = attempt, "Inference call recovered");
                    }
                    return Ok(value);
                }
                Err(e) if !self.is_retryable(&e) => {
                    error!(label = label, attempt = attempt, error = %e, "Non-retryable inference error");
                    return Err(e);
                }
                Err(e) if attempt == attempts => {
                    error!(label = label, attempts = attempts, error = %e, "Inference retries exhausted");
                    return Err(LlmError::RetriesExhausted {
                        attempts,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(label = label, attempt = attempt, error = %e, "Transient inference error");
                }
            }
        }

        // attempts >= 1, so the loop always returns
        Err(LlmError::RequestFailed(format!(
            "{label}: retry loop ended without a result"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> LlmError {
        LlmError::HttpStatus {
            status: 503,
            message: "unavailable".to_string(),
        }
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_retry(4), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(policy.delay_for_retry(10), Duration::from_secs(5));
        assert_eq!(policy.delay_for_retry(5000), Duration::from_secs(5));
    }

    #[test]
    fn test_retryable_classification() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(&unavailable()));
        assert!(policy.is_retryable(&LlmError::NetworkError("reset".to_string())));
        assert!(!policy.is_retryable(&LlmError::HttpStatus {
            status: 400,
            message: "bad".to_string()
        }));
        assert!(!policy.is_retryable(&LlmError::InvalidResponse("x".to_string())));
    }

    #[tokio::test]
    async fn test_succeeds_on_last_attempt() {
        let policy = RetryPolicy::default().without_delay();
        let calls = AtomicU32::new(0);

        let result = policy
            .run("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 5 {
                        Err(unavailable())
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_exhaustion_is_fatal() {
        let policy = RetryPolicy::default().without_delay();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(unavailable()) }
            })
            .await;

        assert!(matches!(
            result,
            Err(LlmError::RetriesExhausted { attempts: 5, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let policy = RetryPolicy::default().without_delay();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(LlmError::HttpStatus {
                        status: 401,
                        message: "unauthorized".to_string(),
                    })
                }
            })
            .await;

        assert_eq!(result.unwrap_err().status(), Some(401));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
