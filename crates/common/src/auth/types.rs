//! Credential and authentication error types

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;

/// A bearer-style token with a bounded validity window
///
/// Credentials are replaced, never mutated. The token manager hands them out
/// as `Arc<Credential>` so a request keeps the value it started with even if
/// another caller refreshes in the meantime.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    issued_at: Instant,
    valid_for: Duration,
}

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>, issued_at: Instant, valid_for: Duration) -> Self {
        Self { token: token.into(), issued_at, valid_for }
    }

    /// Raw token value; never log it.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// When the token was obtained.
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// How long the token stays usable after `issued_at`.
    pub fn valid_for(&self) -> Duration {
        self.valid_for
    }

    /// `true` once strictly more than `valid_for` has passed since issue.
    #[must_use]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.issued_at) > self.valid_for
    }
}

// Keep tokens out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("valid_for", &self.valid_for)
            .finish()
    }
}

/// Errors raised while acquiring a credential
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The backend rejected the supplied credentials
    #[error("Credentials rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The authentication endpoint could not be reached
    #[error("Authentication transport failure: {0}")]
    Transport(String),

    /// The authentication response did not carry a usable token
    #[error("Invalid authentication response: {0}")]
    InvalidResponse(String),

    /// No credentials were configured
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}
