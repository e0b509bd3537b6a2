//! # Circuit Breaker Records
//!
//! Point-in-time snapshots of a breaker's counters, as exposed in composite
//! reports.

use crate::resilience::CircuitState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Snapshot of one circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerRecord {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u64,
    pub consecutive_successes: u64,
    pub total_requests: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub total_rejections: u64,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
}

impl CircuitBreakerRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            total_requests: 0,
            total_successes: 0,
            total_failures: 0,
            total_rejections: 0,
            last_failure_at: None,
            last_success_at: None,
            next_retry_at: None,
        }
    }

    /// Failures over admitted calls (rejections excluded)
    pub fn failure_rate(&self) -> f64 {
        let admitted = self.total_successes + self.total_failures;
        if admitted == 0 {
            return 0.0;
        }
        self.total_failures as f64 / admitted as f64
    }

    pub fn format_summary(&self) -> String {
        format!(
            "State: {} | Requests: {} | Failures: {} | Rejections: {} | Failure rate: {:.1}%",
            self.state,
            self.total_requests,
            self.total_failures,
            self.total_rejections,
            self.failure_rate() * 100.0
        )
    }
}

/// Count breakers per state
pub fn count_by_state(records: &BTreeMap<String, CircuitBreakerRecord>) -> HashMap<CircuitState, usize> {
    let mut counts = HashMap::new();
    for record in records.values() {
        *counts.entry(record.state).or_insert(0) += 1;
    }
    counts
}
