//! Bounded retry for transient store failures.
//!
//! Durable stores wrap each backend call in [`RetryPolicy::run`]. Only
//! errors classified as transient (interrupted I/O, SQLite busy/locked) are
//! retried; everything else is returned immediately. The number of attempts
//! is always bounded, so a request never waits on the store indefinitely.

use std::thread;
use std::time::Duration;

use crate::error::Result;

/// Retry schedule for transient store errors.
///
/// The delay before attempt `n` (1-based, counting retries only) is
/// `initial_backoff * 2^(n-1)`, capped at `max_backoff`.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use visite::retry::RetryPolicy;
///
/// let policy = RetryPolicy::new()
///     .with_max_attempts(5)
///     .with_initial_backoff(Duration::from_millis(2));
/// assert_eq!(policy.max_attempts(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy: 3 attempts, 5ms initial backoff, 50ms cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sets the total number of attempts. Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the delay before the first retry.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Sets the upper bound for a single delay.
    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Total number of attempts, including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::debug!(
                        operation = what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient store error, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::io;

    fn interrupted() -> StoreError {
        StoreError::from(io::Error::from(io::ErrorKind::Interrupted))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new()
            .with_initial_backoff(Duration::from_millis(4))
            .with_max_backoff(Duration::from_millis(10));
        assert_eq!(policy.backoff(1), Duration::from_millis(4));
        assert_eq!(policy.backoff(2), Duration::from_millis(8));
        assert_eq!(policy.backoff(3), Duration::from_millis(10));
        assert_eq!(policy.backoff(40), Duration::from_millis(10));
    }

    #[test]
    fn test_max_attempts_floor() {
        assert_eq!(RetryPolicy::new().with_max_attempts(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
    }

    #[test]
    fn test_retries_transient_until_success() {
        let policy = RetryPolicy::new()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::ZERO);
        let mut calls = 0;
        let result = policy.run("test", || {
            calls += 1;
            if calls < 3 {
                Err(interrupted())
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new()
            .with_max_attempts(2)
            .with_initial_backoff(Duration::ZERO);
        let mut calls = 0;
        let result: Result<()> = policy.run("test", || {
            calls += 1;
            Err(interrupted())
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let policy = RetryPolicy::new().with_initial_backoff(Duration::ZERO);
        let mut calls = 0;
        let result: Result<()> = policy.run("test", || {
            calls += 1;
            Err(StoreError::Poisoned)
        });
        assert!(matches!(result, Err(StoreError::Poisoned)));
        assert_eq!(calls, 1);
    }
}
