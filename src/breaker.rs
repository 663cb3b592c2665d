//! Circuit breaker and per-scope breaker registry.
//!
//! # States
//! - Closed: calls pass; failures are counted
//! - Open: calls are rejected until `open_timeout` has elapsed
//! - Half-open: probe calls pass; enough successes close, any failure reopens
//!
//! # Transitions
//! ```text
//! Closed    -> Open:      consecutive failures >= failure_threshold,
//!                         or full window with failure rate >= failure_rate_threshold
//! Open      -> Half-open: first allow() after open_timeout
//! Half-open -> Closed:    success_threshold successes
//! Half-open -> Open:      any failure
//! ```
//!
//! The open → half-open move happens inside [`CircuitBreaker::allow`]; there
//! is no background timer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Source of the current instant. Swappable for deterministic tests.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Breaker thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures that open a closed breaker.
    pub failure_threshold: u32,
    /// Half-open successes needed to close.
    pub success_threshold: u32,
    /// Time spent open before a probe is allowed.
    pub open_timeout: Duration,
    /// Failure percentage (0-100) over a full window that opens the breaker.
    /// 100 disables rate-based tripping.
    pub failure_rate_threshold: f64,
    /// Number of recent outcomes in the sliding window. 0 disables rate-based tripping.
    pub sliding_window_size: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(30),
            failure_rate_threshold: 50.0,
            sliding_window_size: 10,
        }
    }
}

/// Current breaker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub const fn as_str(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half-open",
        }
    }
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
    half_open_successes: u32,
    // ring buffer of recent outcomes, true = success
    window: Vec<bool>,
    window_pos: usize,
    window_filled: bool,
    last_transition: Instant,
}

impl BreakerInner {
    fn record_outcome(&mut self, success: bool) {
        if self.window.is_empty() {
            return;
        }
        self.window[self.window_pos] = success;
        self.window_pos = (self.window_pos + 1) % self.window.len();
        if self.window_pos == 0 {
            self.window_filled = true;
        }
    }

    fn failure_rate(&self) -> Option<f64> {
        if !self.window_filled || self.window.is_empty() {
            return None;
        }
        let failures = self.window.iter().filter(|ok| !**ok).count();
        Some(failures as f64 * 100.0 / self.window.len() as f64)
    }

    fn reset_counters(&mut self) {
        self.consecutive_failures = 0;
        self.half_open_successes = 0;
        self.window.iter_mut().for_each(|slot| *slot = true);
        self.window_pos = 0;
        self.window_filled = false;
    }

    fn transition(&mut self, to: BreakerState, now: Instant) {
        tracing::debug!(from = %self.state, to = %to, "circuit breaker transition");
        self.state = to;
        self.last_transition = now;
    }
}

/// Three-state circuit breaker. Safe to share across tasks.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker using the system clock.
    pub fn new(config: BreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a breaker reading time from `clock`.
    pub fn with_clock(mut config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        config.failure_threshold = config.failure_threshold.max(1);
        config.success_threshold = config.success_threshold.max(1);
        config.failure_rate_threshold = config.failure_rate_threshold.clamp(0.0, 100.0);

        let now = clock.now();
        Self {
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                window: vec![true; config.sliding_window_size],
                window_pos: 0,
                window_filled: false,
                last_transition: now,
            }),
            config,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a call may proceed.
    pub fn allow(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let now = self.clock.now();
                if now.saturating_duration_since(inner.last_transition) >= self.config.open_timeout
                {
                    inner.half_open_successes = 0;
                    inner.transition(BreakerState::HalfOpen, now);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.record_outcome(true);

        match inner.state {
            BreakerState::Closed => inner.consecutive_failures = 0,
            BreakerState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.success_threshold {
                    inner.reset_counters();
                    let now = self.clock.now();
                    inner.transition(BreakerState::Closed, now);
                }
            }
            BreakerState::Open => {}
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.record_outcome(false);

        match inner.state {
            BreakerState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold
                    || self.rate_exceeded(&inner)
                {
                    let now = self.clock.now();
                    tracing::warn!(
                        consecutive_failures = inner.consecutive_failures,
                        "circuit breaker opened"
                    );
                    inner.transition(BreakerState::Open, now);
                }
            }
            BreakerState::HalfOpen => {
                inner.half_open_successes = 0;
                let now = self.clock.now();
                tracing::warn!("circuit breaker probe failed, reopening");
                inner.transition(BreakerState::Open, now);
            }
            BreakerState::Open => {}
        }
    }

    fn rate_exceeded(&self, inner: &BreakerInner) -> bool {
        if self.config.failure_rate_threshold >= 100.0 {
            return false;
        }
        match inner.failure_rate() {
            Some(rate) => rate > 0.0 && rate >= self.config.failure_rate_threshold,
            None => false,
        }
    }

    /// Current state, without side effects.
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Current consecutive-failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }
}

/// Lazily creates one [`CircuitBreaker`] per scope key.
///
/// Owned by a client; breakers in different scopes never influence each other.
#[derive(Debug)]
pub struct BreakerRegistry {
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            breakers: DashMap::new(),
        }
    }

    /// The breaker for `scope`, created on first use.
    pub fn get(&self, scope: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.get(scope) {
            return breaker.value().clone();
        }
        self.breakers
            .entry(scope.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::with_clock(
                    self.config.clone(),
                    self.clock.clone(),
                ))
            })
            .value()
            .clone()
    }

    /// State of an existing breaker, without creating one.
    pub fn state_of(&self, scope: &str) -> Option<BreakerState> {
        self.breakers.get(scope).map(|b| b.value().state())
    }

    /// Number of scopes seen so far.
    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
