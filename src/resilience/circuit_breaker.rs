//! # Circuit Breaker Implementation
//!
//! Classic three-state breaker: Closed (normal operation), Open (failing
//! fast) and Half-Open (probing recovery).
//!
//! Every [`CircuitBreaker::execute`] call holds the breaker's mutex from
//! admission through outcome recording, so concurrent callers observe a
//! linearizable sequence of transitions.

use crate::resilience::{CircuitBreakerConfig, CircuitBreakerRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Circuit breaker states, numbered by their gauge encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Testing recovery - limited calls allowed to test system health
    HalfOpen = 1,
    /// Failure mode - all calls fail fast without executing
    Open = 2,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::HalfOpen => "half_open",
            CircuitState::Open => "open",
        }
    }

    /// Gauge encoding: 0=closed, 1=half-open, 2=open
    pub fn gauge_value(&self) -> f64 {
        f64::from(*self as u8)
    }
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::HalfOpen,
            _ => CircuitState::Open,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open (or half-open with no probe budget left)
    #[error("Circuit breaker is {state} for {component}")]
    CircuitOpen {
        component: String,
        state: CircuitState,
    },

    /// Operation ran and failed; the failure was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_rejection(&self) -> bool {
        matches!(self, CircuitBreakerError::CircuitOpen { .. })
    }
}

/// Invoked once per actual transition with `(name, from, to)`
pub type StateChangeCallback = Arc<dyn Fn(&str, CircuitState, CircuitState) + Send + Sync>;

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u64,
    consecutive_successes: u64,
    half_open_requests: u32,
    total_requests: u64,
    total_successes: u64,
    total_failures: u64,
    total_rejections: u64,
    last_failure_at: Option<DateTime<Utc>>,
    last_success_at: Option<DateTime<Utc>>,
    opened_at: Option<Instant>,
    next_retry_at: Option<DateTime<Utc>>,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            half_open_requests: 0,
            total_requests: 0,
            total_successes: 0,
            total_failures: 0,
            total_rejections: 0,
            last_failure_at: None,
            last_success_at: None,
            opened_at: None,
            next_retry_at: None,
        }
    }
}

/// Core circuit breaker with a lock-free state mirror for cheap reads
pub struct CircuitBreaker {
    /// Component name for logging and metrics
    name: String,

    /// Sanitized configuration
    config: CircuitBreakerConfig,

    /// Mirror of `inner.state`, updated on every transition
    state: AtomicU8,

    inner: Mutex<BreakerState>,

    on_state_change: Option<StateChangeCallback>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        let config = config.sanitized();

        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            success_threshold = config.success_threshold,
            timeout_ms = config.timeout.as_millis(),
            max_half_open_requests = config.max_half_open_requests,
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            inner: Mutex::new(BreakerState::new()),
            on_state_change: None,
        }
    }

    pub fn with_state_change_callback(mut self, callback: StateChangeCallback) -> Self {
        self.on_state_change = Some(callback);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state without taking the lock.
    ///
    /// An open breaker whose timeout has elapsed still reads as open until
    /// the next call moves it to half-open.
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is_healthy(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Execute an operation with circuit breaker protection
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut inner = self.inner.lock().await;

        if !self.admit(&mut inner) {
            inner.total_requests += 1;
            inner.total_rejections += 1;
            debug!(
                component = %self.name,
                state = %inner.state,
                total_rejections = inner.total_rejections,
                "⛔ Call rejected by circuit breaker"
            );
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
                state: inner.state,
            });
        }

        let mut call = InFlightCall {
            breaker: self,
            inner,
            started: Instant::now(),
            finished: false,
        };

        let result = operation().await;
        call.finish(result.is_ok());

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Decide whether the next call may run, moving Open to Half-Open once
    /// the timeout has elapsed
    fn admit(&self, inner: &mut BreakerState) -> bool {
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map_or(true, |opened| opened.elapsed() >= self.config.timeout);
                if elapsed {
                    self.transition(inner, CircuitState::HalfOpen);
                    inner.half_open_requests = 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_requests < self.config.max_half_open_requests {
                    inner.half_open_requests += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self, inner: &mut BreakerState, duration: Duration) {
        inner.total_requests += 1;
        inner.total_successes += 1;
        inner.consecutive_successes += 1;
        inner.consecutive_failures = 0;
        inner.last_success_at = Some(Utc::now());

        debug!(
            component = %self.name,
            duration_ms = duration.as_millis(),
            "🟢 Operation succeeded"
        );

        if inner.state == CircuitState::HalfOpen
            && inner.consecutive_successes >= u64::from(self.config.effective_success_threshold())
        {
            self.transition(inner, CircuitState::Closed);
        }
    }

    fn record_failure(&self, inner: &mut BreakerState, duration: Duration) {
        inner.total_requests += 1;
        inner.total_failures += 1;
        inner.consecutive_failures += 1;
        inner.consecutive_successes = 0;
        inner.last_failure_at = Some(Utc::now());

        warn!(
            component = %self.name,
            duration_ms = duration.as_millis(),
            consecutive_failures = inner.consecutive_failures,
            "🔴 Operation failed"
        );

        match inner.state {
            CircuitState::Closed => {
                if inner.consecutive_failures >= u64::from(self.config.failure_threshold) {
                    self.transition(inner, CircuitState::Open);
                }
            }
            // Any failure while probing reopens the circuit
            CircuitState::HalfOpen => self.transition(inner, CircuitState::Open),
            CircuitState::Open => {}
        }
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState) {
        let from = inner.state;
        if from == to {
            return;
        }

        inner.state = to;
        self.state.store(to as u8, Ordering::Release);

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
                inner.next_retry_at = chrono::Duration::from_std(self.config.timeout)
                    .ok()
                    .map(|timeout| Utc::now() + timeout);
                inner.half_open_requests = 0;

                error!(
                    component = %self.name,
                    from = %from,
                    consecutive_failures = inner.consecutive_failures,
                    failure_threshold = self.config.failure_threshold,
                    timeout_ms = self.config.timeout.as_millis(),
                    "🔴 Circuit breaker opened (failing fast)"
                );
            }
            CircuitState::HalfOpen => {
                inner.half_open_requests = 0;
                inner.consecutive_failures = 0;
                inner.consecutive_successes = 0;
                inner.next_retry_at = None;

                info!(
                    component = %self.name,
                    success_threshold = self.config.effective_success_threshold(),
                    "🟡 Circuit breaker half-open (testing recovery)"
                );
            }
            CircuitState::Closed => {
                inner.opened_at = None;
                inner.next_retry_at = None;
                inner.half_open_requests = 0;
                inner.consecutive_failures = 0;

                info!(
                    component = %self.name,
                    total_requests = inner.total_requests,
                    "🟢 Circuit breaker closed (recovered)"
                );
            }
        }

        self.notify(from, to);
    }

    fn notify(&self, from: CircuitState, to: CircuitState) {
        if let Some(callback) = &self.on_state_change {
            callback(&self.name, from, to);
        }
    }

    /// Restore a fresh Closed breaker with zeroed counters
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        let from = inner.state;
        *inner = BreakerState::new();
        self.state.store(CircuitState::Closed as u8, Ordering::Release);

        info!(component = %self.name, "🔄 Circuit breaker reset");
        if from != CircuitState::Closed {
            self.notify(from, CircuitState::Closed);
        }
    }

    /// Force circuit to open state (for emergency situations)
    pub async fn force_open(&self) {
        let mut inner = self.inner.lock().await;
        warn!(component = %self.name, "🚨 Circuit breaker forced open");
        self.transition(&mut inner, CircuitState::Open);
    }

    /// Force circuit to closed state (for emergency recovery)
    pub async fn force_close(&self) {
        let mut inner = self.inner.lock().await;
        warn!(component = %self.name, "🚨 Circuit breaker forced closed");
        self.transition(&mut inner, CircuitState::Closed);
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
    }

    /// Snapshot of the breaker's counters
    pub async fn record(&self) -> CircuitBreakerRecord {
        let inner = self.inner.lock().await;
        CircuitBreakerRecord {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            total_requests: inner.total_requests,
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
            total_rejections: inner.total_rejections,
            last_failure_at: inner.last_failure_at,
            last_success_at: inner.last_success_at,
            next_retry_at: inner.next_retry_at,
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Holds the breaker lock for one admitted call. A call dropped before it
/// finishes (cancelled or timed out by its caller) is recorded as a failure
/// so the half-open probe slot it consumed is not leaked.
struct InFlightCall<'a> {
    breaker: &'a CircuitBreaker,
    inner: MutexGuard<'a, BreakerState>,
    started: Instant,
    finished: bool,
}

impl InFlightCall<'_> {
    fn finish(&mut self, succeeded: bool) {
        self.finished = true;
        let duration = self.started.elapsed();
        if succeeded {
            self.breaker.record_success(&mut self.inner, duration);
        } else {
            self.breaker.record_failure(&mut self.inner, duration);
        }
    }
}

impl Drop for InFlightCall<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(component = %self.breaker.name, "Protected call abandoned before completion");
            self.breaker
                .record_failure(&mut self.inner, self.started.elapsed());
        }
    }
}
