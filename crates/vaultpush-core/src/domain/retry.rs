//! Retry policy for upload attempts
//!
//! The policy is immutable and supplied when the sync engine is built.
//! Attempt numbering starts at 1; no delay precedes the first attempt.

use std::time::Duration;

use super::errors::DomainError;

/// Upper bound on any single backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Attempt budget and delay schedule for one job
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    backoff_factor: f64,
}

impl RetryPolicy {
    /// Creates a policy
    ///
    /// `backoff_factor` of 1.0 keeps the delay fixed; larger values grow it
    /// geometrically from the second retry on.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRetryPolicy` if `max_attempts` is zero or
    /// `backoff_factor` is not a finite number >= 1.0
    pub fn new(max_attempts: u32, delay: Duration, backoff_factor: f64) -> Result<Self, DomainError> {
        if max_attempts == 0 {
            return Err(DomainError::InvalidRetryPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !backoff_factor.is_finite() || backoff_factor < 1.0 {
            return Err(DomainError::InvalidRetryPolicy(format!(
                "backoff_factor must be a finite number >= 1.0, got {backoff_factor}"
            )));
        }
        Ok(Self {
            max_attempts,
            delay,
            backoff_factor,
        })
    }

    /// Fixed delay between attempts
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRetryPolicy` if `max_attempts` is zero
    pub fn fixed(max_attempts: u32, delay: Duration) -> Result<Self, DomainError> {
        Self::new(max_attempts, delay, 1.0)
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    /// Delay to wait before starting `attempt` (1-based)
    ///
    /// Attempt 1 starts immediately, attempt 2 waits the base delay, and
    /// each later attempt multiplies the previous delay by the backoff
    /// factor, capped at five minutes.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 || self.delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let secs = self.delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::from_secs_f64(secs.min(MAX_BACKOFF.as_secs_f64()))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            backoff_factor: 1.0,
        }
    }
}
