//! Resilience patterns for outbound calls
//!
//! - **Circuit Breaker**: per-endpoint failure tripwire with half-open probes
//! - **Rate Limiter**: per-endpoint sliding-window throttle
//! - **Retry**: classification-driven retry decisions with exponential backoff
//!   and jitter
//!
//! All time-dependent state reads through the [`Clock`] trait so tests can
//! drive it with [`MockClock`].

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerRegistry, CircuitRecord,
    CircuitState, Clock, ConfigError, ConfigResult, MockClock, SystemClock,
};
pub use rate_limiter::{Admission, RateLimitConfig, RateLimitConfigBuilder, SlidingWindowLimiter};
pub use retry::{RetryConfig, RetryConfigBuilder, RetryDecision};

use std::time::Duration;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
