//! Credential acquisition seam
//!
//! The token manager never talks to a login endpoint directly; it calls an
//! [`Authenticator`], which tests replace with in-memory doubles.

use async_trait::async_trait;

use super::types::{AuthError, Credential};

/// Source of fresh credentials
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Obtain a new credential
    ///
    /// # Errors
    /// Returns error if the backend rejects the login or cannot be reached
    async fn authenticate(&self) -> Result<Credential, AuthError>;
}

#[async_trait]
impl<T: Authenticator + ?Sized> Authenticator for std::sync::Arc<T> {
    async fn authenticate(&self) -> Result<Credential, AuthError> {
        (**self).authenticate().await
    }
}
