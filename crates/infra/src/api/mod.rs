//! Compute console API client
//!
//! # Architecture
//!
//! ```text
//! ComputeClient ─► Paginator ─► RequestExecutor ─► HttpClient
//!                                 │
//!                                 ├─ CircuitBreakerRegistry (per endpoint)
//!                                 ├─ SlidingWindowLimiter   (per endpoint)
//!                                 ├─ RetryConfig
//!                                 └─ TokenManager ─► PasswordAuthenticator
//! ```
//!
//! - Every outcome is classified into exactly one `ErrorKind`
//! - A 401 triggers one forced re-authentication that does not consume a retry
//! - Paginated fetches return records in offset order in every mode

pub mod auth;
pub mod classify;
pub mod client;
pub mod errors;
pub mod executor;
pub mod pagination;
pub mod request;

pub use auth::PasswordAuthenticator;
pub use classify::{classify, classify_reqwest};
pub use client::{ComputeClient, ComputeClientBuilder};
pub use errors::ApiError;
pub use executor::RequestExecutor;
pub use pagination::Paginator;
pub use request::{ApiRequest, ApiResponse, Fetched, PageFailure, PagedRecords};
