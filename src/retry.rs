//! Bounded retry with linear backoff for fallible async steps.
//!
//! Page navigation and content waits depend on a remote site and are wrapped
//! in [`RetryPolicy::execute`]. Every attempt runs the operation afresh; the
//! operation is expected to carry its own timeout.
//!
//! # Delay Calculation
//!
//! ```text
//! delay before attempt k (k >= 2) = base_delay * (k - 1)
//! ```
//!
//! With defaults (3 attempts, 500ms base) the delays are 500ms then 1000ms.
//!
//! # Example
//!
//! ```
//! use csctm_core::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let policy = RetryPolicy::new(3, Duration::from_millis(1));
//! let value = policy
//!     .execute("reading a value", || async { Ok::<_, std::io::Error>(7) })
//!     .await
//!     .unwrap();
//! assert_eq!(value, 7);
//! # });
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument};

/// Default number of attempts (including the first one).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for linear backoff (500 milliseconds).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Errors surfaced by the retry executor.
#[derive(Debug, Clone, Error)]
pub enum RetryError {
    /// Every attempt failed.
    #[error("failed after {attempts} attempts while {label}. Last error: {last_error}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Human-readable description of the operation.
        label: String,
        /// Message of the error returned by the final attempt.
        last_error: String,
    },
}

impl RetryError {
    /// Returns the label of the operation that gave up.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Exhausted { label, .. } => label,
        }
    }
}

/// Configuration for bounded retries with linear backoff.
///
/// No jitter is applied and no cancellation is supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Delay unit; attempt k waits `base_delay * (k - 1)`.
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Creates a policy with a custom attempt budget and the default base delay.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the base delay.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay to sleep before `attempt` (1-indexed). The first attempt never waits.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_sub(1))
    }

    /// Runs `operation` until it succeeds or the attempt budget is spent.
    ///
    /// Intermediate failures are discarded. When every attempt fails the
    /// returned [`RetryError::Exhausted`] carries the attempt count, `label`
    /// and the final error's message.
    #[instrument(skip(self, operation), fields(max_attempts = self.max_attempts))]
    pub async fn execute<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let delay = self.delay_before(attempt);
            if !delay.is_zero() {
                debug!(attempt, delay_ms = delay.as_millis(), "backing off");
                tokio::time::sleep(delay).await;
            }

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= self.max_attempts => {
                    debug!(attempt, error = %e, "attempts exhausted");
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        label: label.to_string(),
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    debug!(attempt, error = %e, "attempt failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    use super::*;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(5))
    }

    // ==================== RetryPolicy Tests ====================

    #[test]
    fn test_retry_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.base_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_retry_policy_max_attempts_minimum_is_one() {
        let policy = RetryPolicy::with_max_attempts(0);
        assert_eq!(policy.max_attempts(), 1);
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_delay_is_linear_not_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_millis(1000));
        assert_eq!(policy.delay_before(4), Duration::from_millis(1500));
    }

    // ==================== Execute Tests ====================

    #[tokio::test]
    async fn test_execute_first_attempt_success_runs_once() {
        let calls = AtomicU32::new(0);
        let result = fast_policy()
            .execute("counting", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>("done")
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast_policy()
            .execute("flaky step", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("failure {n}"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_exhausted_reports_label_attempts_and_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), RetryError> = fast_policy()
            .execute("loading the share URL", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("boom {n}"))
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let RetryError::Exhausted {
            attempts,
            label,
            last_error,
        } = &err;
        assert_eq!(*attempts, 3);
        assert_eq!(label, "loading the share URL");
        assert_eq!(last_error, "boom 3");
        assert_eq!(
            err.to_string(),
            "failed after 3 attempts while loading the share URL. Last error: boom 3"
        );
    }

    #[tokio::test]
    async fn test_execute_single_attempt_policy_does_not_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<(), RetryError> = RetryPolicy::new(1, Duration::from_secs(60))
            .execute("once", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("nope")
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_waits_between_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        let started = Instant::now();
        let _: Result<(), RetryError> = policy.execute("slow", || async { Err("x") }).await;

        // 20ms before attempt 2, 40ms before attempt 3
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_execute_from_sync_context() {
        let result = tokio_test::block_on(
            RetryPolicy::new(2, Duration::ZERO).execute("sync", || async { Ok::<_, String>(1) }),
        );
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn test_retry_error_label_accessor() {
        let err = RetryError::Exhausted {
            attempts: 3,
            label: "waiting".to_string(),
            last_error: "timeout".to_string(),
        };
        assert_eq!(err.label(), "waiting");
    }
}
