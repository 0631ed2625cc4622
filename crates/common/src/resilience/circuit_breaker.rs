//! Per-endpoint circuit breaker
//!
//! One [`CircuitBreakerRegistry`] guards every endpoint a client talks to.
//! Each endpoint key owns an independent [`CircuitRecord`], created lazily on
//! first use, so a failing path never blocks calls to a healthy one.
//!
//! State machine per key:
//!
//! ```text
//!   Closed --(failure_threshold consecutive failures)--> Open
//!   Open --(timeout elapsed, checked on next admission)--> HalfOpen
//!   HalfOpen --(success_threshold successes)--> Closed
//!   HalfOpen --(any failure)--> Open
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

//==============================================================================
// Time Abstraction for Testability
//==============================================================================

/// Trait for time operations to enable deterministic testing
///
/// Production code uses [`SystemClock`]; tests drive [`MockClock`] forward
/// explicitly so timeout-based transitions need no real delays.
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Get milliseconds since UNIX epoch
    fn millis_since_epoch(&self) -> u64 {
        let millis = self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed offset, so a test can hand one clone to the
/// component under test and advance another.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self::with_current_time(Instant::now())
    }

    /// Create a new mock clock with a specific start time
    pub fn with_current_time(start: Instant) -> Self {
        Self { start, elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Advance the mock clock by milliseconds (convenience method)
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Set the mock clock to a specific elapsed time
    pub fn set_elapsed(&self, duration: Duration) {
        *self.elapsed.lock() = duration;
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + self.elapsed()
    }
}

//==============================================================================
// Configuration
//==============================================================================

/// Simple configuration error for validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

/// Configuration result type using simple config errors
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, allowing limited requests to test recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u64,
    /// Number of successes needed to close the circuit from half-open
    pub success_threshold: u64,
    /// Time to wait after the last failure before probing again
    pub timeout: Duration,
    /// Maximum number of concurrent probes allowed in half-open state
    pub half_open_max_calls: u64,
    /// Whether to reset failure count on success in closed state
    pub reset_on_success: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 1,
            timeout: Duration::from_secs(30),
            half_open_max_calls: 1,
            reset_on_success: true,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid("failure_threshold must be greater than 0"));
        }
        if self.success_threshold == 0 {
            return Err(ConfigError::invalid("success_threshold must be greater than 0"));
        }
        if self.half_open_max_calls == 0 {
            return Err(ConfigError::invalid("half_open_max_calls must be greater than 0"));
        }
        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    /// Builder seeded with the default thresholds.
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    /// Consecutive failures that open the circuit.
    pub fn failure_threshold(mut self, threshold: u64) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    /// Half-open successes needed to close the circuit.
    pub fn success_threshold(mut self, threshold: u64) -> Self {
        self.config.success_threshold = threshold;
        self
    }

    /// How long the circuit stays open before probing.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Probe requests admitted while half-open.
    pub fn half_open_max_calls(mut self, max_calls: u64) -> Self {
        self.config.half_open_max_calls = max_calls;
        self
    }

    /// Clear the failure count on every closed-state success.
    pub fn reset_on_success(mut self, reset: bool) -> Self {
        self.config.reset_on_success = reset;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//==============================================================================
// Per-endpoint state
//==============================================================================

/// Breaker state for a single endpoint key.
///
/// `state == Open` implies `last_failure.is_some()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitRecord {
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failures while closed
    pub failure_count: u64,
    /// Successes since entering half-open
    pub success_count: u64,
    /// Probes currently admitted in half-open
    pub half_open_calls: u64,
    /// Time of the most recent recorded failure.
    pub last_failure: Option<Instant>,
}

impl Default for CircuitRecord {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            half_open_calls: 0,
            last_failure: None,
        }
    }
}

impl CircuitRecord {
    fn open(&mut self, at: Instant) {
        self.state = CircuitState::Open;
        self.last_failure = Some(at);
        self.success_count = 0;
        self.half_open_calls = 0;
    }

    fn close(&mut self) {
        *self = Self::default();
    }
}

/// Keyed circuit breaker shared by every caller of one client.
///
/// Cloning is cheap and clones share state.
pub struct CircuitBreakerRegistry<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    records: Arc<DashMap<String, CircuitRecord>>,
    clock: Arc<C>,
}

impl<C: Clock> fmt::Debug for CircuitBreakerRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerRegistry")
            .field("config", &self.config)
            .field("endpoints", &self.records.len())
            .finish()
    }
}

impl<C: Clock> Clone for CircuitBreakerRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            records: Arc::clone(&self.records),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl CircuitBreakerRegistry<SystemClock> {
    /// Create a registry using the system clock
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> CircuitBreakerRegistry<C> {
    /// Create a registry with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { config, records: Arc::new(DashMap::new()), clock: Arc::new(clock) })
    }

    /// Configuration shared by every endpoint.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Admit a new call for `endpoint`.
    ///
    /// Moves an expired `Open` record to `HalfOpen` and claims a probe slot
    /// there. Returns `false` when the call must be rejected.
    pub fn try_acquire(&self, endpoint: &str) -> bool {
        let now = self.clock.now();
        let mut record = self.records.entry(endpoint.to_string()).or_default();
        self.promote_if_expired(endpoint, &mut record, now);

        match record.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                debug!(endpoint, "circuit open, rejecting call");
                false
            }
            CircuitState::HalfOpen => {
                if record.half_open_calls < self.config.half_open_max_calls {
                    record.half_open_calls += 1;
                    true
                } else {
                    debug!(endpoint, "half-open probe limit reached, rejecting call");
                    false
                }
            }
        }
    }

    /// Check whether an already admitted call may keep going.
    ///
    /// Unlike [`try_acquire`](Self::try_acquire) this never claims a probe
    /// slot; it only fails while the record is `Open` and not yet expired.
    pub fn is_available(&self, endpoint: &str) -> bool {
        let now = self.clock.now();
        match self.records.get_mut(endpoint) {
            Some(mut record) => {
                self.promote_if_expired(endpoint, &mut record, now);
                record.state != CircuitState::Open
            }
            None => true,
        }
    }

    /// Record a successful call
    pub fn record_success(&self, endpoint: &str) {
        let mut record = self.records.entry(endpoint.to_string()).or_default();
        match record.state {
            CircuitState::Closed => {
                if self.config.reset_on_success {
                    record.failure_count = 0;
                }
            }
            CircuitState::HalfOpen => {
                record.success_count += 1;
                record.half_open_calls = record.half_open_calls.saturating_sub(1);
                if record.success_count >= self.config.success_threshold {
                    let successes = record.success_count;
                    record.close();
                    info!(endpoint, successes, "circuit breaker closed");
                }
            }
            CircuitState::Open => {
                warn!(endpoint, "received success while circuit is open");
            }
        }
    }

    /// Record a terminal failure
    pub fn record_failure(&self, endpoint: &str) {
        let now = self.clock.now();
        let mut record = self.records.entry(endpoint.to_string()).or_default();
        match record.state {
            CircuitState::Closed => {
                record.failure_count += 1;
                record.last_failure = Some(now);
                if record.failure_count >= self.config.failure_threshold {
                    let failures = record.failure_count;
                    record.open(now);
                    warn!(endpoint, failures, "circuit breaker opened");
                }
            }
            CircuitState::HalfOpen => {
                record.open(now);
                warn!(endpoint, "probe failed, circuit breaker reopened");
            }
            CircuitState::Open => {
                record.last_failure = Some(now);
            }
        }
    }

    /// Current state for `endpoint`; unknown endpoints are `Closed`.
    ///
    /// Reports `Open` until the next admission check performs the lazy
    /// transition to `HalfOpen`.
    pub fn state(&self, endpoint: &str) -> CircuitState {
        self.records.get(endpoint).map_or(CircuitState::Closed, |record| record.state)
    }

    /// Snapshot of the record for `endpoint`, if one exists.
    pub fn record(&self, endpoint: &str) -> Option<CircuitRecord> {
        self.records.get(endpoint).map(|record| record.clone())
    }

    /// Forget all state for `endpoint`.
    pub fn reset(&self, endpoint: &str) {
        self.records.remove(endpoint);
    }

    fn promote_if_expired(&self, endpoint: &str, record: &mut CircuitRecord, now: Instant) {
        if record.state != CircuitState::Open {
            return;
        }
        let expired = record
            .last_failure
            .is_some_and(|at| now.saturating_duration_since(at) >= self.config.timeout);
        if expired {
            record.state = CircuitState::HalfOpen;
            record.success_count = 0;
            record.half_open_calls = 0;
            info!(endpoint, "circuit breaker half-open, probing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(clock: &MockClock) -> CircuitBreakerRegistry<MockClock> {
        CircuitBreakerRegistry::with_clock(CircuitBreakerConfig::default(), clock.clone()).unwrap()
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let clock = MockClock::new();
        let breaker = registry(&clock);

        for _ in 0..2 {
            assert!(breaker.try_acquire("/api/v1/images"));
            breaker.record_failure("/api/v1/images");
        }
        assert_eq!(breaker.state("/api/v1/images"), CircuitState::Closed);

        assert!(breaker.try_acquire("/api/v1/images"));
        breaker.record_failure("/api/v1/images");
        assert_eq!(breaker.state("/api/v1/images"), CircuitState::Open);
        assert!(!breaker.try_acquire("/api/v1/images"));
        assert!(breaker.record("/api/v1/images").unwrap().last_failure.is_some());
    }

    #[test]
    fn endpoints_are_isolated() {
        let clock = MockClock::new();
        let breaker = registry(&clock);

        for _ in 0..3 {
            breaker.record_failure("/api/v1/images");
        }
        assert!(!breaker.try_acquire("/api/v1/images"));
        assert!(breaker.try_acquire("/api/v1/hosts"));
        assert_eq!(breaker.state("/api/v1/hosts"), CircuitState::Closed);
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let clock = MockClock::new();
        let breaker = registry(&clock);

        breaker.record_failure("e");
        breaker.record_failure("e");
        breaker.record_success("e");
        breaker.record_failure("e");
        breaker.record_failure("e");
        assert_eq!(breaker.state("e"), CircuitState::Closed);
    }

    #[test]
    fn half_open_after_timeout_then_closes_on_success() {
        let clock = MockClock::new();
        let breaker = registry(&clock);
        for _ in 0..3 {
            breaker.record_failure("e");
        }

        clock.advance(Duration::from_secs(29));
        assert!(!breaker.try_acquire("e"));

        clock.advance(Duration::from_secs(1));
        assert!(breaker.try_acquire("e"));
        assert_eq!(breaker.state("e"), CircuitState::HalfOpen);
        // Probe slot taken
        assert!(!breaker.try_acquire("e"));

        breaker.record_success("e");
        assert_eq!(breaker.state("e"), CircuitState::Closed);
        assert!(breaker.try_acquire("e"));
    }

    #[test]
    fn half_open_failure_reopens() {
        let clock = MockClock::new();
        let breaker = registry(&clock);
        for _ in 0..3 {
            breaker.record_failure("e");
        }
        clock.advance(Duration::from_secs(30));
        assert!(breaker.try_acquire("e"));

        breaker.record_failure("e");
        assert_eq!(breaker.state("e"), CircuitState::Open);
        assert!(!breaker.try_acquire("e"));

        clock.advance(Duration::from_secs(30));
        assert!(breaker.try_acquire("e"));
    }

    #[test]
    fn is_available_does_not_claim_probe_slots() {
        let clock = MockClock::new();
        let breaker = registry(&clock);
        for _ in 0..3 {
            breaker.record_failure("e");
        }
        assert!(!breaker.is_available("e"));

        clock.advance(Duration::from_secs(30));
        assert!(breaker.try_acquire("e"));
        assert!(breaker.is_available("e"));
        assert!(breaker.is_available("e"));
        assert!(breaker.is_available("unknown"));
    }

    #[test]
    fn config_validation() {
        assert!(CircuitBreakerConfig::builder().failure_threshold(0).build().is_err());
        assert!(CircuitBreakerConfig::builder().success_threshold(0).build().is_err());
        assert!(CircuitBreakerConfig::builder().half_open_max_calls(0).build().is_err());
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(5)
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn state_display() {
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
    }
}
