//! Credential lifecycle for token-authenticated APIs
//!
//! ```text
//! ┌─────────────────┐
//! │  TokenManager   │  one live credential, refresh on expiry / rejection
//! └────────┬────────┘
//!          │
//!          └──► Authenticator  (login endpoint, injected)
//! ```
//!
//! - **[`types`]**: `Credential`, `AuthError`
//! - **[`traits`]**: the `Authenticator` seam
//! - **[`token_manager`]**: serialized login and deduplicated refresh

pub mod token_manager;
pub mod traits;
pub mod types;

pub use token_manager::TokenManager;
pub use traits::Authenticator;
pub use types::{AuthError, Credential};
