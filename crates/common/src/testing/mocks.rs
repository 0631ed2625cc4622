//! Mock implementations of common traits

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::auth::{AuthError, Authenticator, Credential};
use crate::resilience::Clock;

/// Authenticator issuing `token-1`, `token-2`, ... on successive logins
///
/// Failures queued with [`fail_next`](Self::fail_next) are returned before
/// any further token is issued.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use cwpp_common::resilience::MockClock;
/// use cwpp_common::testing::SequenceAuthenticator;
///
/// let auth = SequenceAuthenticator::new(MockClock::new(), Duration::from_secs(590));
/// assert_eq!(auth.calls(), 0);
/// ```
#[derive(Debug)]
pub struct SequenceAuthenticator<C: Clock> {
    clock: C,
    valid_for: Duration,
    calls: AtomicUsize,
    issued: AtomicUsize,
    failures: Mutex<VecDeque<AuthError>>,
}

impl<C: Clock> SequenceAuthenticator<C> {
    /// Authenticator issuing `token-1`, `token-2`, ... stamped by `clock`.
    pub fn new(clock: C, valid_for: Duration) -> Self {
        Self {
            clock,
            valid_for,
            calls: AtomicUsize::new(0),
            issued: AtomicUsize::new(0),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue an error for the next login attempt
    pub fn fail_next(&self, error: AuthError) {
        self.failures.lock().push_back(error);
    }

    /// Login attempts so far, failed ones included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tokens issued so far
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C: Clock> Authenticator for SequenceAuthenticator<C> {
    async fn authenticate(&self) -> Result<Credential, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        let number = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Credential::new(format!("token-{number}"), self.clock.now(), self.valid_for))
    }
}

/// Authenticator that always returns the same token
#[derive(Debug, Clone)]
pub struct StaticAuthenticator {
    token: String,
    valid_for: Duration,
}

impl StaticAuthenticator {
    /// Authenticator that always returns `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into(), valid_for: Duration::from_secs(590) }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self) -> Result<Credential, AuthError> {
        Ok(Credential::new(self.token.clone(), std::time::Instant::now(), self.valid_for))
    }
}
