//! Sliding-window rate limiting keyed per endpoint
//!
//! Each key keeps the timestamps of its admitted requests for the trailing
//! minute. Two caps apply before a request goes out:
//!
//! - **Per minute**: when the trailing-60 s count has reached the cap, the
//!   caller waits once for `minute_cooldown - (now - oldest)`, if positive.
//! - **Per second**: while the trailing-1 s count is at the cap, the caller
//!   sleeps `second_backoff` and re-checks.
//!
//! The timestamp is recorded at the moment the per-second check passes, under
//! the key's map-entry lock, so concurrent callers can never put more than the
//! per-second cap into any rolling one-second window.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use super::{saturating_millis, Clock, ConfigError, ConfigResult, SystemClock};

const MINUTE: Duration = Duration::from_secs(60);
const SECOND: Duration = Duration::from_secs(1);

/// Configuration for the sliding-window limiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted per key in any rolling second
    pub max_per_second: usize,
    /// Requests per key in the trailing minute before the cooldown applies
    pub max_per_minute: usize,
    /// Reference span for the per-minute cooldown
    pub minute_cooldown: Duration,
    /// Pause between per-second re-checks
    pub second_backoff: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_second: 2,
            max_per_minute: 20,
            minute_cooldown: Duration::from_secs(5),
            second_backoff: Duration::from_millis(500),
        }
    }
}

impl RateLimitConfig {
    /// Start from the default limits.
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_per_second == 0 {
            return Err(ConfigError::invalid("max_per_second must be greater than 0"));
        }
        if self.max_per_minute == 0 {
            return Err(ConfigError::invalid("max_per_minute must be greater than 0"));
        }
        if self.second_backoff.is_zero() {
            return Err(ConfigError::invalid("second_backoff must be greater than zero"));
        }
        Ok(())
    }
}

/// Builder for RateLimitConfig
#[derive(Debug, Default)]
pub struct RateLimitConfigBuilder {
    config: RateLimitConfig,
}

impl RateLimitConfigBuilder {
    /// Requests allowed per endpoint in any one-second window.
    pub fn max_per_second(mut self, max: usize) -> Self {
        self.config.max_per_second = max;
        self
    }

    /// Requests allowed per endpoint in the trailing minute.
    pub fn max_per_minute(mut self, max: usize) -> Self {
        self.config.max_per_minute = max;
        self
    }

    /// Reference cooldown once the per-minute cap is reached.
    pub fn minute_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.minute_cooldown = cooldown;
        self
    }

    /// Sleep between per-second re-checks.
    pub fn second_backoff(mut self, backoff: Duration) -> Self {
        self.config.second_backoff = backoff;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> ConfigResult<RateLimitConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Result of a non-blocking admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Timestamp recorded, the request may go out now
    Granted,
    /// Not recorded; re-check after the delay
    Wait(Duration),
}

/// Per-key sliding-window limiter.
///
/// Cloning is cheap and clones share state.
pub struct SlidingWindowLimiter<C: Clock = SystemClock> {
    config: RateLimitConfig,
    windows: Arc<DashMap<String, VecDeque<Instant>>>,
    clock: Arc<C>,
}

impl<C: Clock> fmt::Debug for SlidingWindowLimiter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlidingWindowLimiter")
            .field("config", &self.config)
            .field("keys", &self.windows.len())
            .finish()
    }
}

impl<C: Clock> Clone for SlidingWindowLimiter<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            windows: Arc::clone(&self.windows),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl SlidingWindowLimiter<SystemClock> {
    /// Limiter on the system clock.
    pub fn new(config: RateLimitConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> SlidingWindowLimiter<C> {
    /// Create a limiter with a custom clock (useful for testing)
    pub fn with_clock(config: RateLimitConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { config, windows: Arc::new(DashMap::new()), clock: Arc::new(clock) })
    }

    /// Limits applied to every key.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Cooldown owed because the per-minute cap is reached, if any.
    pub fn minute_cooldown(&self, key: &str) -> Option<Duration> {
        let mut window = self.windows.entry(key.to_string()).or_default();
        // Read the clock under the entry lock so timestamps stay ordered
        let now = self.clock.now();
        prune(&mut window, now);

        if window.len() < self.config.max_per_minute {
            return None;
        }
        let oldest = *window.front()?;
        let delay = self.config.minute_cooldown.saturating_sub(now.saturating_duration_since(oldest));
        (!delay.is_zero()).then_some(delay)
    }

    /// Admit and record a request if the per-second cap allows it.
    pub fn check_second(&self, key: &str) -> Admission {
        let mut window = self.windows.entry(key.to_string()).or_default();
        let now = self.clock.now();
        prune(&mut window, now);

        let in_last_second =
            window.iter().rev().take_while(|at| now.saturating_duration_since(**at) < SECOND).count();
        if in_last_second >= self.config.max_per_second {
            return Admission::Wait(self.config.second_backoff);
        }
        window.push_back(now);
        Admission::Granted
    }

    /// Wait until a request for `key` may go out, then record it.
    pub async fn acquire(&self, key: &str) {
        if let Some(delay) = self.minute_cooldown(key) {
            debug!(endpoint = key, delay_ms = saturating_millis(delay), "per-minute cap reached, cooling down");
            tokio::time::sleep(delay).await;
        }

        loop {
            match self.check_second(key) {
                Admission::Granted => return,
                Admission::Wait(delay) => {
                    debug!(endpoint = key, delay_ms = saturating_millis(delay), "per-second cap reached");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Requests recorded for `key` in the trailing minute.
    pub fn recent_requests(&self, key: &str) -> usize {
        let now = self.clock.now();
        self.windows.get_mut(key).map_or(0, |mut window| {
            prune(&mut window, now);
            window.len()
        })
    }

    /// Timestamps recorded for `key`, oldest first.
    pub fn timestamps(&self, key: &str) -> Vec<Instant> {
        self.windows.get(key).map(|window| window.iter().copied().collect()).unwrap_or_default()
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant) {
    while window.front().is_some_and(|at| now.saturating_duration_since(*at) >= MINUTE) {
        window.pop_front();
    }
}
