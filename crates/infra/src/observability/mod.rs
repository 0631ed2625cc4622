//! Observability: structured logging via `tracing`
//!
//! The client emits `tracing` events and spans throughout (request spans with
//! endpoint, offset and method fields; retry and breaker transitions at
//! `warn`; pagination progress at `info`). [`init_logging`] installs a
//! subscriber for binaries and tests that want to see them.

pub mod logging;

pub use logging::{env_filter, init_logging};
