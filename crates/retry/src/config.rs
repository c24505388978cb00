use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Rejected retry configuration. Raised when an executor is built, never
/// deferred to the first failed attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetryConfigError {
    #[error("max_retries must be a non-negative integer, got {0}")]
    InvalidMaxRetries(String),
    #[error("backoff_multiplier must be finite and > 1.0, got {0}")]
    InvalidMultiplier(f64),
    #[error("base_delay must be greater than zero")]
    ZeroBaseDelay,
    #[error("max_delay ({max_delay:?}) is shorter than base_delay ({base_delay:?})")]
    DelayBounds {
        base_delay: Duration,
        max_delay: Duration,
    },
}

/// Retry policy: how many extra attempts to make and how long to wait
/// between them.
///
/// # Example
/// ```
/// use retry::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_max_retries(3)
///     .with_base_delay(Duration::from_millis(100));
///
/// assert_eq!(config.delay_for(1), Duration::from_millis(100));
/// assert_eq!(config.delay_for(2), Duration::from_millis(200));
/// assert_eq!(config.delay_for(3), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts allowed after the first failure. `0` fails fast.
    pub max_retries: u32,
    /// Wait before the first retry, in milliseconds.
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    /// Upper bound for any single wait, in milliseconds.
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    /// Growth factor applied per retry.
    pub backoff_multiplier: f64,
    /// Add up to 25% random extra wait on top of the computed delay, still
    /// bounded by `max_delay`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set `max_retries` from an untyped number (JSON, YAML, FFI input).
    ///
    /// Negative, fractional, non-finite and out-of-range values are rejected.
    pub fn try_with_max_retries(mut self, raw: f64) -> Result<Self, RetryConfigError> {
        self.max_retries = parse_max_retries(raw)?;
        Ok(self)
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Check the invariants the executor relies on.
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        // delays must grow with every retry
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 1.0 {
            return Err(RetryConfigError::InvalidMultiplier(self.backoff_multiplier));
        }
        if self.base_delay.is_zero() {
            return Err(RetryConfigError::ZeroBaseDelay);
        }
        if self.max_delay < self.base_delay {
            return Err(RetryConfigError::DelayBounds {
                base_delay: self.base_delay,
                max_delay: self.max_delay,
            });
        }
        Ok(())
    }

    /// Wait before retry number `retry` (1-indexed), at millisecond
    /// resolution. Retry 0 is the first attempt and never waits.
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        // base_delay * multiplier^(retry-1), capped at max_delay
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let cap_ms = self.max_delay.as_secs_f64() * 1000.0;
        let scaled_ms =
            self.base_delay.as_secs_f64() * 1000.0 * self.backoff_multiplier.powi(exponent);
        let delay_ms = if scaled_ms.is_finite() {
            scaled_ms.min(cap_ms)
        } else {
            cap_ms
        };
        let delay = Duration::from_millis(delay_ms.max(0.0).round() as u64);

        if self.jitter {
            let quarter = u64::try_from(delay.as_millis() / 4).unwrap_or(u64::MAX);
            if quarter > 0 {
                let jittered = delay + Duration::from_millis(fastrand::u64(0..=quarter));
                return jittered.min(self.max_delay);
            }
        }

        delay
    }
}

/// Convert an untyped retry count into `u32`.
pub fn parse_max_retries(raw: f64) -> Result<u32, RetryConfigError> {
    if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 || raw > f64::from(u32::MAX) {
        return Err(RetryConfigError::InvalidMaxRetries(raw.to_string()));
    }
    Ok(raw as u32)
}
