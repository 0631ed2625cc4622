//! Testing utilities and helpers
//!
//! - **[`mocks`]**: in-memory `Authenticator` doubles
//! - [`MockClock`] re-exported for deterministic time in breaker, limiter and
//!   token tests
//!
//! ```rust
//! use std::time::Duration;
//!
//! use cwpp_common::testing::MockClock;
//!
//! let clock = MockClock::new();
//! clock.advance(Duration::from_secs(30));
//! assert_eq!(clock.elapsed(), Duration::from_secs(30));
//! ```

pub mod mocks;

pub use mocks::{SequenceAuthenticator, StaticAuthenticator};

pub use crate::resilience::{Clock, MockClock, SystemClock};
