//! # Circuit Breaker Registry
//!
//! Named breakers created on demand and shared across checkers.

use crate::resilience::metrics::count_by_state;
use crate::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRecord, CircuitState, StateChangeCallback,
};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry of circuit breakers keyed by component name
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,

    /// Used when a breaker is created without an explicit config
    default_config: CircuitBreakerConfig,

    /// Attached to every breaker this registry creates
    on_state_change: Option<StateChangeCallback>,
}

impl CircuitBreakerRegistry {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            default_config: default_config.sanitized(),
            on_state_change: None,
        }
    }

    pub fn with_state_change_callback(mut self, callback: StateChangeCallback) -> Self {
        self.on_state_change = Some(callback);
        self
    }

    pub fn default_config(&self) -> &CircuitBreakerConfig {
        &self.default_config
    }

    /// Get or create a breaker with the default config
    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        self.get_or_create_with(name, self.default_config.clone())
    }

    /// Get or create a breaker; `config` only applies when the breaker is new
    pub fn get_or_create_with(&self, name: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return Arc::clone(existing.value());
        }

        let entry = self.breakers.entry(name.to_string()).or_insert_with(|| {
            let mut breaker = CircuitBreaker::new(name, config);
            if let Some(callback) = &self.on_state_change {
                breaker = breaker.with_state_change_callback(Arc::clone(callback));
            }
            Arc::new(breaker)
        });
        let breaker = Arc::clone(entry.value());
        drop(entry);

        info!(
            component = name,
            total_circuit_breakers = self.breakers.len(),
            "Registered circuit breaker"
        );
        breaker
    }

    /// Replace any existing breaker under `name` with a fresh one
    pub fn replace(&self, name: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        self.breakers.remove(name);
        self.get_or_create_with(name, config)
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, name: &str) -> bool {
        let removed = self.breakers.remove(name).is_some();
        if removed {
            info!(
                component = name,
                remaining_count = self.breakers.len(),
                "Removed circuit breaker"
            );
        }
        removed
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<CircuitBreaker>> {
        self.breakers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Snapshot of every breaker, keyed by name
    pub async fn records(&self) -> BTreeMap<String, CircuitBreakerRecord> {
        let mut records = BTreeMap::new();
        for breaker in self.snapshot() {
            records.insert(breaker.name().to_string(), breaker.record().await);
        }
        records
    }

    pub async fn state_summary(&self) -> HashMap<CircuitState, usize> {
        count_by_state(&self.records().await)
    }

    /// Fraction of breakers currently closed; 1.0 when there are none
    pub fn health_score(&self) -> f64 {
        let total = self.breakers.len();
        if total == 0 {
            return 1.0;
        }
        let closed = self
            .breakers
            .iter()
            .filter(|entry| entry.value().is_healthy())
            .count();
        closed as f64 / total as f64
    }

    /// Force open all circuit breakers (emergency stop)
    pub async fn force_open_all(&self) {
        warn!("🚨 Forcing all circuit breakers open (emergency stop)");
        for breaker in self.snapshot() {
            breaker.force_open().await;
        }
    }

    /// Force close all circuit breakers (emergency recovery)
    pub async fn force_close_all(&self) {
        warn!("🚨 Forcing all circuit breakers closed (emergency recovery)");
        for breaker in self.snapshot() {
            breaker.force_close().await;
        }
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl fmt::Debug for CircuitBreakerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerRegistry")
            .field("breakers", &self.names())
            .field("default_config", &self.default_config)
            .finish_non_exhaustive()
    }
}
