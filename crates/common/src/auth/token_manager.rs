//! Token manager with transparent refresh
//!
//! Holds exactly one live credential per client:
//! - lazily authenticates on first use and whenever the credential expires
//! - re-authenticates on demand after the backend rejects a token, collapsing
//!   concurrent refresh requests for the same stale credential into one login

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::traits::Authenticator;
use super::types::{AuthError, Credential};
use crate::resilience::{Clock, SystemClock};

/// Thread-safe holder of the current credential
pub struct TokenManager<C: Clock = SystemClock> {
    authenticator: Arc<dyn Authenticator>,
    current: Mutex<Option<Arc<Credential>>>,
    clock: Arc<C>,
    logins: AtomicU64,
}

impl<C: Clock> fmt::Debug for TokenManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager").field("logins", &self.login_count()).finish_non_exhaustive()
    }
}

impl TokenManager<SystemClock> {
    #[must_use]
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self::with_clock(authenticator, SystemClock)
    }
}

impl<C: Clock> TokenManager<C> {
    /// Create a token manager with a custom clock (useful for testing)
    #[must_use]
    pub fn with_clock(authenticator: Arc<dyn Authenticator>, clock: C) -> Self {
        Self {
            authenticator,
            current: Mutex::new(None),
            clock: Arc::new(clock),
            logins: AtomicU64::new(0),
        }
    }

    /// Return a credential that has not expired, logging in if necessary.
    ///
    /// # Errors
    /// Returns the authenticator's error when a login is needed and fails
    #[instrument(skip(self))]
    pub async fn ensure_valid(&self) -> Result<Arc<Credential>, AuthError> {
        let mut current = self.current.lock().await;
        if let Some(credential) = current.as_ref() {
            if !credential.is_expired_at(self.clock.now()) {
                return Ok(Arc::clone(credential));
            }
            debug!("credential expired, re-authenticating");
        }
        self.login(&mut current).await
    }

    /// Replace `stale` after the backend rejected it.
    ///
    /// If another caller already replaced `stale` with a credential that is
    /// still valid, that credential is returned without a new login.
    ///
    /// # Errors
    /// Returns the authenticator's error when the login fails
    #[instrument(skip(self, stale))]
    pub async fn force_refresh(&self, stale: &Arc<Credential>) -> Result<Arc<Credential>, AuthError> {
        let mut current = self.current.lock().await;
        if let Some(credential) = current.as_ref() {
            if !Arc::ptr_eq(credential, stale) && !credential.is_expired_at(self.clock.now()) {
                debug!("credential already refreshed by another caller");
                return Ok(Arc::clone(credential));
            }
        }
        info!("forcing re-authentication after rejected credential");
        self.login(&mut current).await
    }

    /// Current credential without refreshing, if any.
    pub async fn current(&self) -> Option<Arc<Credential>> {
        self.current.lock().await.clone()
    }

    /// Drop the current credential so the next call logs in again.
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }

    /// Number of successful logins performed so far.
    pub fn login_count(&self) -> u64 {
        self.logins.load(Ordering::Acquire)
    }

    async fn login(&self, slot: &mut Option<Arc<Credential>>) -> Result<Arc<Credential>, AuthError> {
        match self.authenticator.authenticate().await {
            Ok(credential) => {
                let credential = Arc::new(credential);
                *slot = Some(Arc::clone(&credential));
                self.logins.fetch_add(1, Ordering::AcqRel);
                info!(valid_for_secs = credential.valid_for().as_secs(), "authenticated");
                Ok(credential)
            }
            Err(error) => {
                warn!(%error, "authentication failed");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::resilience::MockClock;
    use crate::testing::SequenceAuthenticator;

    #[tokio::test]
    async fn logs_in_once_while_credential_is_fresh() {
        let clock = MockClock::new();
        let auth = Arc::new(SequenceAuthenticator::new(clock.clone(), Duration::from_secs(590)));
        let manager = TokenManager::with_clock(auth.clone(), clock.clone());

        let first = manager.ensure_valid().await.unwrap();
        let second = manager.ensure_valid().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(auth.calls(), 1);
        assert_eq!(first.token(), "token-1");
    }

    #[tokio::test]
    async fn refreshes_after_expiry() {
        let clock = MockClock::new();
        let auth = Arc::new(SequenceAuthenticator::new(clock.clone(), Duration::from_secs(590)));
        let manager = TokenManager::with_clock(auth.clone(), clock.clone());

        manager.ensure_valid().await.unwrap();
        clock.advance(Duration::from_secs(591));
        let refreshed = manager.ensure_valid().await.unwrap();

        assert_eq!(refreshed.token(), "token-2");
        assert_eq!(manager.login_count(), 2);
    }

    #[tokio::test]
    async fn force_refresh_skips_login_when_already_replaced() {
        let clock = MockClock::new();
        let auth = Arc::new(SequenceAuthenticator::new(clock.clone(), Duration::from_secs(590)));
        let manager = TokenManager::with_clock(auth.clone(), clock.clone());

        let stale = manager.ensure_valid().await.unwrap();
        let fresh = manager.force_refresh(&stale).await.unwrap();
        let again = manager.force_refresh(&stale).await.unwrap();

        assert_eq!(fresh.token(), "token-2");
        assert!(Arc::ptr_eq(&fresh, &again));
        assert_eq!(auth.calls(), 2);
    }

    #[tokio::test]
    async fn failed_login_keeps_no_credential() {
        let clock = MockClock::new();
        let auth = Arc::new(SequenceAuthenticator::new(clock.clone(), Duration::from_secs(590)));
        auth.fail_next(AuthError::Rejected { status: 401, message: "bad password".into() });
        let manager = TokenManager::with_clock(auth.clone(), clock);

        let error = manager.ensure_valid().await.unwrap_err();
        assert!(matches!(error, AuthError::Rejected { status: 401, .. }));
        assert!(manager.current().await.is_none());
        assert_eq!(manager.login_count(), 0);
    }
}
