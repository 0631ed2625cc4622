//! Conversion of serde-friendly settings into runtime resilience configs

use std::time::Duration;

use cwpp_common::resilience::{
    CircuitBreakerConfig, ConfigResult, RateLimitConfig, RetryConfig,
};
use cwpp_domain::{CircuitBreakerSettings, RateLimitSettings, RetrySettings};

/// Build the retry policy described by `settings`.
///
/// # Errors
/// Returns `ConfigError::Invalid` when the backoff bounds are inconsistent
pub fn retry_config(settings: &RetrySettings) -> ConfigResult<RetryConfig> {
    RetryConfig::builder()
        .max_retries(settings.max_retries)
        .base_delay(Duration::from_millis(settings.base_delay_ms))
        .max_backoff(Duration::from_millis(settings.max_backoff_ms))
        .jitter(settings.jitter)
        .retry_status_codes(settings.retry_status_codes.iter().copied())
        .build()
}

/// Breaker settings as a validated runtime config.
pub fn circuit_breaker_config(settings: &CircuitBreakerSettings) -> ConfigResult<CircuitBreakerConfig> {
    CircuitBreakerConfig::builder()
        .failure_threshold(settings.failure_threshold)
        .success_threshold(settings.success_threshold)
        .timeout(Duration::from_secs(settings.timeout_secs))
        .half_open_max_calls(settings.half_open_max_calls)
        .build()
}

/// Rate-limit settings as a validated runtime config.
pub fn rate_limit_config(settings: &RateLimitSettings) -> ConfigResult<RateLimitConfig> {
    RateLimitConfig::builder()
        .max_per_second(settings.max_requests_per_second)
        .max_per_minute(settings.max_requests_per_minute)
        .minute_cooldown(Duration::from_millis(settings.minute_cooldown_ms))
        .second_backoff(Duration::from_millis(settings.second_backoff_ms))
        .build()
}
