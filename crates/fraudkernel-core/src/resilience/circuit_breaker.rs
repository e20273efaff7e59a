//! Circuit Breaker Pattern
//!
//! Isolates a failing collaborator so that every transaction does not pay
//! for the same failure.
//!
//! # States
//!
//! - **Closed**: Normal operation, calls pass through
//! - **Open**: Failures exceeded threshold, calls are rejected without running
//! - **HalfOpen**: Probing whether the collaborator has recovered
//!
//! # Example
//!
//! ```rust,ignore
//! use fraudkernel_core::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! let cb = CircuitBreaker::new("classifier", CircuitBreakerConfig::default());
//! let confidence = cb.call(|| classifier.predict(&features)).unwrap_or(0.0);
//! ```

use crate::error::{FraudError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitState {
    /// Circuit is closed, calls pass through
    #[default]
    Closed,
    /// Circuit is open, calls fail fast
    Open,
    /// Circuit is half-open, testing recovery
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Successes needed in half-open state to close the circuit
    pub success_threshold: u32,
    /// Time to wait before moving from open to half-open
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Raise zero thresholds to 1, as the builder methods do.
    #[must_use]
    pub fn sanitized(self) -> Self {
        if self.failure_threshold == 0 || self.success_threshold == 0 {
            tracing::warn!(
                failure_threshold = self.failure_threshold,
                success_threshold = self.success_threshold,
                "Circuit breaker thresholds must be positive, raising to 1"
            );
        }
        let (failures, successes) = (self.failure_threshold, self.success_threshold);
        self.failure_threshold(failures).success_threshold(successes)
    }

    /// Set failure threshold
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set success threshold for closing
    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold.max(1);
        self
    }

    /// Set reset timeout
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct CircuitBreakerInner {
    state: Mutex<BreakerState>,
    total_calls: AtomicU64,
    total_failures: AtomicU64,
    total_rejected: AtomicU64,
}

/// Circuit breaker guarding one collaborator.
///
/// Clones share state, so a breaker can be handed to several engines that
/// talk to the same collaborator.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Arc<CircuitBreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config: config.sanitized(),
            inner: Arc::new(CircuitBreakerInner::default()),
        }
    }

    /// Name of the protected collaborator
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, after applying any due open → half-open transition
    pub fn state(&self) -> CircuitState {
        let mut guard = self.lock();
        self.refresh(&mut guard);
        guard.state
    }

    /// Check if a call would currently be let through
    pub fn is_allowed(&self) -> bool {
        self.state() != CircuitState::Open
    }

    /// Run `f` under breaker protection.
    ///
    /// Returns `FraudError::CircuitOpen` without calling `f` while the circuit
    /// is open. Any error returned by `f` counts as a failure.
    pub fn call<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.inner.total_calls.fetch_add(1, Ordering::Relaxed);

        if !self.is_allowed() {
            self.inner.total_rejected.fetch_add(1, Ordering::Relaxed);
            return Err(FraudError::CircuitOpen(self.name.clone()));
        }

        let result = f();
        match &result {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        result
    }

    /// Manually record a success
    pub fn record_success(&self) {
        let mut guard = self.lock();
        match guard.state {
            CircuitState::Closed => guard.failure_count = 0,
            CircuitState::HalfOpen => {
                guard.success_count += 1;
                if guard.success_count >= self.config.success_threshold {
                    guard.state = CircuitState::Closed;
                    guard.failure_count = 0;
                    guard.success_count = 0;
                    guard.opened_at = None;
                    tracing::info!(collaborator = %self.name, "Circuit breaker closed");
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Manually record a failure
    pub fn record_failure(&self) {
        self.inner.total_failures.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.lock();
        match guard.state {
            CircuitState::Closed => {
                guard.failure_count += 1;
                if guard.failure_count >= self.config.failure_threshold {
                    self.open(&mut guard);
                }
            }
            // Any failure while probing reopens the circuit
            CircuitState::HalfOpen => self.open(&mut guard),
            CircuitState::Open => {}
        }
    }

    /// Manually reset the circuit breaker
    pub fn reset(&self) {
        *self.lock() = BreakerState::default();
    }

    /// Get statistics
    pub fn stats(&self) -> CircuitBreakerStats {
        CircuitBreakerStats {
            total_calls: self.inner.total_calls.load(Ordering::Relaxed),
            total_failures: self.inner.total_failures.load(Ordering::Relaxed),
            total_rejected: self.inner.total_rejected.load(Ordering::Relaxed),
            current_failures: self.lock().failure_count,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self, guard: &mut BreakerState) {
        guard.state = CircuitState::Open;
        guard.success_count = 0;
        guard.opened_at = Some(Instant::now());
        tracing::warn!(collaborator = %self.name, "Circuit breaker opened");
    }

    fn refresh(&self, guard: &mut BreakerState) {
        if guard.state != CircuitState::Open {
            return;
        }
        let due = guard
            .opened_at
            .is_none_or(|at| at.elapsed() >= self.config.reset_timeout);
        if due {
            guard.state = CircuitState::HalfOpen;
            guard.success_count = 0;
            tracing::info!(collaborator = %self.name, "Circuit breaker half-open");
        }
    }
}

/// Circuit breaker statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerStats {
    /// Calls attempted through this breaker
    pub total_calls: u64,
    /// Failures recorded
    pub total_failures: u64,
    /// Calls rejected while open
    pub total_rejected: u64,
    /// Current consecutive failure count
    pub current_failures: u32,
}
