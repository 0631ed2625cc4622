//! # CWPP Infrastructure
//!
//! Request-execution core for the CWPP console REST API.
//!
//! This crate contains:
//! - The HTTP transport wrapper (`reqwest`)
//! - The single-request executor with retry, rate limiting, circuit breaking
//!   and credential refresh
//! - The pagination orchestrator (single, sequential, concurrent)
//! - Configuration loading (environment, TOML, JSON)
//! - Logging initialization
//!
//! ## Architecture
//! - Resilience primitives and the token manager live in `cwpp-common`
//! - Configuration and response types live in `cwpp-domain`
//! - Contains all I/O

pub mod api;
pub mod config;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{
    ApiError, ApiRequest, ApiResponse, ComputeClient, ComputeClientBuilder, PageFailure,
    PagedRecords, PasswordAuthenticator,
};
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::init_logging;
