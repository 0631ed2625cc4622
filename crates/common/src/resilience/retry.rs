//! Retry decisions and exponential backoff with jitter
//!
//! The policy is a pure function of the classified failure and the attempt
//! number; the caller owns the loop and the sleeping.

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;

use super::{ConfigError, ConfigResult};
use crate::error::ErrorKind;

/// Fraction of the delay added as random jitter
const JITTER_FRACTION: f64 = 0.1;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries allowed after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Cap on the exponential delay before jitter
    pub max_backoff: Duration,
    /// Add uniform jitter in `[0, 0.1 * delay]`
    pub jitter: bool,
    /// Status codes retried regardless of their kind
    pub retry_status_codes: HashSet<u16>,
    /// Kinds retried by default
    pub retryable_kinds: HashSet<ErrorKind>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            jitter: true,
            retry_status_codes: [408, 429, 500, 502, 503, 504].into_iter().collect(),
            retryable_kinds: ErrorKind::TRANSIENT.into_iter().collect(),
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_backoff < self.base_delay {
            return Err(ConfigError::invalid("max_backoff must not be smaller than base_delay"));
        }
        Ok(())
    }

    /// Decide whether a failed attempt should be retried.
    ///
    /// `attempt` is zero-based. A status listed in `retry_status_codes` is
    /// retried even when its kind is not in `retryable_kinds`.
    pub fn should_retry(&self, kind: ErrorKind, status: Option<u16>, attempt: u32) -> RetryDecision {
        if attempt >= self.max_retries {
            return RetryDecision::Stop;
        }
        let by_status = status.is_some_and(|code| self.retry_status_codes.contains(&code));
        if by_status || self.retryable_kinds.contains(&kind) {
            RetryDecision::Retry(self.backoff_delay(attempt))
        } else {
            RetryDecision::Stop
        }
    }

    /// Delay before the retry following `attempt`.
    ///
    /// Attempt 0 waits exactly `base_delay`; later attempts wait
    /// `min(base * 2^attempt, max_backoff)` plus jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.base_delay;
        }
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_backoff);
        if self.jitter {
            delay + jitter_for(delay)
        } else {
            delay
        }
    }
}

fn jitter_for(delay: Duration) -> Duration {
    let range = delay.mul_f64(JITTER_FRACTION);
    if range.is_zero() {
        return Duration::ZERO;
    }
    range.mul_f64(rand::thread_rng().gen_range(0.0..=1.0))
}

/// Outcome of a retry decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay
    Retry(Duration),
    /// Give up and surface the error
    Stop,
}

impl RetryDecision {
    /// Whether another attempt should be made.
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Retries after the first attempt.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Delay before the first retry.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    /// Upper bound on the exponential delay.
    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.config.max_backoff = delay;
        self
    }

    /// Add up to 10% random jitter to each delay.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.config.jitter = enabled;
        self
    }

    /// Deterministic delays.
    pub fn no_jitter(self) -> Self {
        self.jitter(false)
    }

    /// Status codes retried regardless of their kind.
    pub fn retry_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.config.retry_status_codes = codes.into_iter().collect();
        self
    }

    /// Error kinds eligible for retry.
    pub fn retryable_kinds(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.config.retryable_kinds = kinds.into_iter().collect();
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> ConfigResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds_retry_until_budget_is_spent() {
        let config = RetryConfig::default();
        for attempt in 0..3 {
            assert!(config.should_retry(ErrorKind::ServerError, Some(500), attempt).is_retry());
            assert!(config.should_retry(ErrorKind::ConnectionError, None, attempt).is_retry());
        }
        assert_eq!(config.should_retry(ErrorKind::ServerError, Some(500), 3), RetryDecision::Stop);
    }

    #[test]
    fn permanent_kinds_never_retry() {
        let config = RetryConfig::default();
        for kind in [
            ErrorKind::AuthenticationError,
            ErrorKind::AuthorizationError,
            ErrorKind::NotFound,
            ErrorKind::ClientError,
            ErrorKind::ParseError,
            ErrorKind::Unknown,
        ] {
            assert_eq!(config.should_retry(kind, None, 0), RetryDecision::Stop, "{kind}");
        }
    }

    #[test]
    fn status_code_list_is_an_additive_override() {
        let config = RetryConfig::builder()
            .retryable_kinds([ErrorKind::ConnectionError])
            .retry_status_codes([409])
            .build()
            .unwrap();

        assert!(config.should_retry(ErrorKind::ClientError, Some(409), 0).is_retry());
        assert_eq!(config.should_retry(ErrorKind::ServerError, Some(500), 0), RetryDecision::Stop);
    }

    #[test]
    fn first_backoff_is_base_delay() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_delay(0), Duration::from_secs(1));
    }

    #[test]
    fn backoff_grows_exponentially_without_jitter() {
        let config = RetryConfig::builder().no_jitter().build().unwrap();
        assert_eq!(config.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(config.backoff_delay(5), Duration::from_secs(32));
        assert_eq!(config.backoff_delay(6), Duration::from_secs(60));
        assert_eq!(config.backoff_delay(40), Duration::from_secs(60));
    }

    #[test]
    fn jittered_backoff_stays_within_ten_percent_of_cap() {
        let config = RetryConfig::default();
        let ceiling = config.max_backoff.mul_f64(1.1);
        let mut previous_floor = Duration::ZERO;
        for attempt in 0..12 {
            let delay = config.backoff_delay(attempt);
            assert!(delay <= ceiling, "attempt {attempt}: {delay:?}");
            assert!(delay >= previous_floor, "attempt {attempt}: {delay:?}");
            previous_floor = config.base_delay.saturating_mul(2u32.pow(attempt)).min(config.max_backoff);
        }
    }

    #[test]
    fn rejects_cap_below_base() {
        let result = RetryConfig::builder()
            .base_delay(Duration::from_secs(5))
            .max_backoff(Duration::from_secs(1))
            .build();
        assert!(result.is_err());
    }
}
