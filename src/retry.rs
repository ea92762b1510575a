// Exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn calculate_backoff(&self, retry_attempt: u32) -> Duration {
        let base_backoff_ms = (self.initial_backoff_ms as f64
            * self.backoff_multiplier.powf(retry_attempt as f64))
        .min(self.max_backoff_ms as f64);

        // Spread callers that failed together
        let jitter = rand::random::<f64>() * self.jitter_factor * base_backoff_ms;
        let backoff_ms = base_backoff_ms * (1.0 - self.jitter_factor / 2.0) + jitter;

        Duration::from_millis(backoff_ms as u64)
    }
}

/// Runs `f` until it succeeds, fails with a non-retryable error, or runs out of retries.
///
/// Only transient network and provider server failures are retried. Auth, validation,
/// mapping and persistence failures are returned on the first attempt.
pub async fn with_backoff<T, F, Fut>(config: &RetryConfig, operation: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_retries => {
                let backoff = config.calculate_backoff(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    kind = ?err.kind,
                    error = %err.message,
                    "retrying after failure"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ErrorSource, NormalizedError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use test_case::test_case;

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    fn failure(kind: ErrorKind, status: u16) -> NormalizedError {
        NormalizedError::new(kind, status, "boom", ErrorSource::Hotelbeds)
    }

    #[test_case(0, 100 ; "first retry")]
    #[test_case(1, 200 ; "second retry")]
    #[test_case(3, 800 ; "fourth retry")]
    #[test_case(10, 10000 ; "capped")]
    fn test_backoff_without_jitter(attempt: u32, expected_ms: u64) {
        let config = RetryConfig {
            jitter_factor: 0.0,
            ..RetryConfig::default()
        };
        assert_eq!(config.calculate_backoff(attempt), Duration::from_millis(expected_ms));
    }

    #[test]
    fn test_backoff_jitter_stays_in_band() {
        let config = RetryConfig::default();
        for _ in 0..50 {
            let ms = config.calculate_backoff(1).as_millis() as u64;
            assert!((190..=210).contains(&ms), "backoff {} out of band", ms);
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_backoff(&fast(), "fetch", move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(failure(ErrorKind::ProviderServerFailure, 503))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_backoff(&fast(), "fetch", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(failure(ErrorKind::TransientNetworkFailure, 503))
        })
        .await;

        assert_eq!(result.unwrap_err().kind, ErrorKind::TransientNetworkFailure);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test_case(ErrorKind::AuthFailure, 401 ; "auth")]
    #[test_case(ErrorKind::ProviderValidationFailure, 400 ; "validation")]
    #[test_case(ErrorKind::MappingFailure, 502 ; "mapping")]
    #[tokio::test]
    async fn test_does_not_retry_permanent_failures(kind: ErrorKind, status: u16) {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_backoff(&fast(), "fetch", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(failure(kind, status))
        })
        .await;

        assert_eq!(result.unwrap_err().kind, kind);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
