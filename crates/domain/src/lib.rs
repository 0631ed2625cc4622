//! # CWPP Domain
//!
//! Domain types shared by the CWPP request-execution crates.
//!
//! This crate contains:
//! - Domain error types and Result definitions
//! - Client configuration structures (serde-friendly, with defaults)
//! - Response and pagination data types
//! - Wire-level constants for the console API conventions
//!
//! ## Architecture
//! - No dependencies on other CWPP crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
