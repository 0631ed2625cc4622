//! Client configuration structures
//!
//! Every section carries serde defaults so a config file only needs to name
//! the values it overrides. Durations are stored as plain integers (seconds
//! or milliseconds, per the field suffix) to keep TOML/JSON/env parsing
//! trivial; the infrastructure layer converts them into runtime configs.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_BASE_URL, DEFAULT_BREAKER_TIMEOUT_SECS,
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_MAX_CALLS,
    DEFAULT_MAX_BACKOFF_MS, DEFAULT_MAX_REQUESTS_PER_MINUTE, DEFAULT_MAX_REQUESTS_PER_SECOND,
    DEFAULT_MAX_RETRIES, DEFAULT_MINUTE_COOLDOWN_MS, DEFAULT_PAGE_LIMIT,
    DEFAULT_POOL_MAX_IDLE_PER_HOST, DEFAULT_RETRY_STATUS_CODES, DEFAULT_SECOND_BACKOFF_MS,
    DEFAULT_SUCCESS_THRESHOLD, DEFAULT_TIMEOUT_SECS, DEFAULT_TOKEN_VALID_FOR_SECS,
    DEFAULT_USER_AGENT, DEFAULT_WORKERS,
};
use crate::errors::{CwppError, Result};

/// How the credential is attached to outgoing requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum AuthHeaderStyle {
    /// `Authorization: Bearer <token>`
    #[default]
    Bearer,
    /// Raw token in a custom header (e.g. `x-redlock-auth`)
    Custom { name: String },
}

impl AuthHeaderStyle {
    /// Header name the token is sent in.
    pub fn header_name(&self) -> &str {
        match self {
            Self::Bearer => "Authorization",
            Self::Custom { name } => name,
        }
    }

    /// Header value for the given token.
    pub fn header_value(&self, token: &str) -> String {
        match self {
            Self::Bearer => format!("Bearer {token}"),
            Self::Custom { .. } => token.to_string(),
        }
    }
}

/// Retry behaviour for transient failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Upper bound on the exponential delay (before jitter)
    pub max_backoff_ms: u64,
    /// Add up to 10% random jitter to each delay
    pub jitter: bool,
    /// Status codes that are always retried
    pub retry_status_codes: Vec<u16>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            jitter: true,
            retry_status_codes: DEFAULT_RETRY_STATUS_CODES.to_vec(),
        }
    }
}

/// Per-endpoint circuit breaker thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures that open an endpoint's circuit.
    pub failure_threshold: u64,
    /// Half-open successes that close it again.
    pub success_threshold: u64,
    /// Seconds an open circuit waits before probing.
    pub timeout_secs: u64,
    /// Probe requests admitted while half-open.
    pub half_open_max_calls: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            timeout_secs: DEFAULT_BREAKER_TIMEOUT_SECS,
            half_open_max_calls: DEFAULT_HALF_OPEN_MAX_CALLS,
        }
    }
}

/// Per-endpoint outbound throttle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Per-endpoint cap in any one-second window.
    pub max_requests_per_second: usize,
    /// Per-endpoint cap in the trailing minute.
    pub max_requests_per_minute: usize,
    /// Reference span for the capped per-minute cooldown
    pub minute_cooldown_ms: u64,
    /// Fixed pause applied while the per-second cap is reached
    pub second_backoff_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests_per_second: DEFAULT_MAX_REQUESTS_PER_SECOND,
            max_requests_per_minute: DEFAULT_MAX_REQUESTS_PER_MINUTE,
            minute_cooldown_ms: DEFAULT_MINUTE_COOLDOWN_MS,
            second_backoff_ms: DEFAULT_SECOND_BACKOFF_MS,
        }
    }
}

/// Logging output options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

/// Configuration for the compute API client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Console address, e.g. `https://console.example.com:8083`
    pub base_url: String,
    /// Per-request timeout (connect + read)
    pub timeout_secs: u64,
    /// TCP/TLS connect timeout.
    pub connect_timeout_secs: u64,
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Skip TLS certificate verification (self-signed consoles).
    pub accept_invalid_certs: bool,
    /// Page size for paginated listings
    pub page_limit: u64,
    /// Worker count used when a concurrent fetch does not name one
    pub default_workers: usize,
    /// How the token is attached to requests.
    pub auth_header: AuthHeaderStyle,
    /// Validity window of a freshly issued token
    pub token_valid_for_secs: u64,
    /// Retry policy.
    pub retry: RetrySettings,
    /// Per-endpoint circuit breaker.
    pub circuit_breaker: CircuitBreakerSettings,
    /// Per-endpoint rate limits.
    pub rate_limit: RateLimitSettings,
    /// Log level and format.
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: false,
            page_limit: DEFAULT_PAGE_LIMIT,
            default_workers: DEFAULT_WORKERS,
            auth_header: AuthHeaderStyle::default(),
            token_valid_for_secs: DEFAULT_TOKEN_VALID_FOR_SECS,
            retry: RetrySettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            rate_limit: RateLimitSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration pointing at `base_url` with all other defaults.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `CwppError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        fn invalid(message: &str) -> Result<()> {
            Err(CwppError::Config(message.to_string()))
        }

        let base = self.base_url.trim();
        if base.is_empty() {
            return invalid("base_url must not be empty");
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return invalid("base_url must start with http:// or https://");
        }
        if self.timeout_secs == 0 {
            return invalid("timeout_secs must be greater than 0");
        }
        if self.page_limit == 0 {
            return invalid("page_limit must be greater than 0");
        }
        if self.default_workers == 0 {
            return invalid("default_workers must be greater than 0");
        }
        if self.token_valid_for_secs == 0 {
            return invalid("token_valid_for_secs must be greater than 0");
        }
        if let AuthHeaderStyle::Custom { name } = &self.auth_header {
            if name.trim().is_empty() {
                return invalid("auth_header.name must not be empty");
            }
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return invalid("circuit_breaker.failure_threshold must be greater than 0");
        }
        if self.circuit_breaker.success_threshold == 0 {
            return invalid("circuit_breaker.success_threshold must be greater than 0");
        }
        if self.circuit_breaker.half_open_max_calls == 0 {
            return invalid("circuit_breaker.half_open_max_calls must be greater than 0");
        }
        if self.rate_limit.max_requests_per_second == 0 {
            return invalid("rate_limit.max_requests_per_second must be greater than 0");
        }
        if self.rate_limit.max_requests_per_minute == 0 {
            return invalid("rate_limit.max_requests_per_minute must be greater than 0");
        }
        if self.retry.max_backoff_ms < self.retry.base_delay_ms {
            return invalid("retry.max_backoff_ms must not be smaller than retry.base_delay_ms");
        }
        Ok(())
    }

    /// Join a relative API path onto the configured base URL.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}
