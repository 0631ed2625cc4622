//! Shared building blocks for the CWPP client crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error taxonomy (`ErrorKind`, `ErrorClassification`)
//! - `observability`: tracing instrumentation
//! - `runtime`: resilience (circuit breaker, rate limiter, retry) and the
//!   credential lifecycle (`auth`)
//! - `test-utils`: mock authenticators and clock helpers for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod auth;
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "runtime", any(feature = "test-utils", test)))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use auth::{AuthError, Authenticator, Credential, TokenManager};
#[cfg(feature = "foundation")]
pub use error::{ErrorClassification, ErrorKind, ErrorSeverity, TransportFailure};
#[cfg(feature = "runtime")]
pub use resilience::{
    Admission, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitRecord, CircuitState, Clock,
    ConfigError, ConfigResult, MockClock, RateLimitConfig, RetryConfig, RetryDecision,
    SlidingWindowLimiter, SystemClock,
};
