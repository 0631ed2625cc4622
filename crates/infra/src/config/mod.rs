//! Configuration loading and conversion
//!
//! [`loader`] reads a `ClientConfig` from the environment or a file;
//! [`runtime`] turns its sections into the resilience configs used by the
//! request executor.

pub mod loader;
pub mod runtime;

pub use loader::{load, load_from_env, load_from_file, parse_config, probe_config_paths};
pub use runtime::{circuit_breaker_config, rate_limit_config, retry_config};
