//! Retry schedule for conflicting role writes.
//!
//! When a conditional write loses to a concurrent writer, the role store
//! re-reads the member set and tries again, waiting with exponential backoff
//! between attempts so competing writers spread out.
//!
//! # Example
//!
//! ```rust
//! use warden_rbac::retry::RetryConfig;
//! use std::time::Duration;
//!
//! let config = RetryConfig {
//!     max_attempts: 4,
//!     initial_delay: Duration::from_millis(10),
//!     max_delay: Duration::from_millis(25),
//!     exponential_base: 2.0,
//! };
//!
//! assert_eq!(config.delay_after(1), Duration::from_millis(10));
//! assert_eq!(config.delay_after(2), Duration::from_millis(20));
//! assert_eq!(config.delay_after(3), Duration::from_millis(25));
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for conflict retries.
///
/// Controls how many times a conflicting write is attempted and how long to
/// wait between attempts.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of write attempts (at least 1)
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub initial_delay: Duration,

    /// Maximum delay between attempts
    pub max_delay: Duration,

    /// Base for exponential backoff (typically 2.0)
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(500),
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a configuration that never retries.
    ///
    /// The first conflicting write fails immediately.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            exponential_base: 1.0,
        }
    }

    /// Override the number of attempts, keeping the backoff shape.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// Never exceeds `max_delay`; a negative base yields no delay.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.exponential_base.powi(exponent);
        let secs = secs.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(self.max_delay)
    }

    /// Effective attempt budget.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Execute a function with retries.
///
/// `f` is called up to `config.attempts()` times. Errors for which
/// `retryable` is false are returned at once; retryable ones wait
/// `delay_after(attempt)` and try again. The last error is returned when the
/// budget runs out.
pub async fn with_retry<F, Fut, T, E, R>(config: &RetryConfig, retryable: R, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Debug,
{
    let attempts = config.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match f().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if !retryable(&e) => return Err(e),
            Err(e) if attempt >= attempts => {
                tracing::warn!(attempts = attempt, error = ?e, "All retry attempts exhausted");
                return Err(e);
            }
            Err(e) => {
                let delay = config.delay_after(attempt);
                tracing::warn!(
                    attempt = attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = ?e,
                    "Attempt failed, retrying"
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.delay_after(1), Duration::from_millis(10));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_after(30), config.max_delay);
    }

    #[test]
    fn test_no_retry() {
        let config = RetryConfig::no_retry();
        assert_eq!(config.attempts(), 1);
        assert_eq!(config.delay_after(1), Duration::ZERO);
    }

    #[test]
    fn test_attempts_never_zero() {
        let config = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert_eq!(config.attempts(), 1);
        assert_eq!(RetryConfig::default().with_max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn test_negative_base_does_not_panic() {
        let config = RetryConfig {
            exponential_base: -2.0,
            ..RetryConfig::default()
        };
        assert_eq!(config.delay_after(2), Duration::ZERO);
        assert_eq!(config.delay_after(3), Duration::from_millis(40));
    }

    fn quick(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            exponential_base: 2.0,
        }
    }

    #[tokio::test]
    async fn test_with_retry_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<u32, &str> = with_retry(&quick(5), |_| true, move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err("busy")
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_stops_on_fatal_error() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), &str> = with_retry(&quick(5), |e| *e == "busy", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("broken")
        })
        .await;

        assert_eq!(result, Err("broken"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_exhausts_budget() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), &str> = with_retry(&quick(3), |_| true, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("busy")
        })
        .await;

        assert_eq!(result, Err("busy"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
