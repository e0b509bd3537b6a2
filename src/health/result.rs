//! # Check Results and Reports
//!
//! Value types produced by checkers and aggregated by the registry.

use crate::constants::HealthStatus;
use crate::utils::serde::duration_ms;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Structured payload attached to a check result.
///
/// Each checker kind carries its own shape so consumers can match on the
/// variant instead of probing an untyped map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckMetadata {
    #[default]
    None,
    Database {
        open_connections: u32,
        in_use: u32,
        idle: u32,
        max_open: u32,
    },
    Http {
        status_code: u16,
        url: String,
    },
    Network {
        address: String,
    },
    CircuitBreaker {
        state: String,
        consecutive_failures: u64,
        total_rejections: u64,
    },
    Custom {
        values: serde_json::Map<String, serde_json::Value>,
    },
}

impl CheckMetadata {
    pub fn is_none(&self) -> bool {
        matches!(self, CheckMetadata::None)
    }

    pub fn custom<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        CheckMetadata::Custom {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Outcome of one checker invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "CheckMetadata::is_none")]
    pub metadata: CheckMetadata,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
            timestamp: Utc::now(),
            duration: Duration::ZERO,
            metadata: CheckMetadata::None,
        }
    }

    pub fn healthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Healthy, message)
    }

    pub fn degraded(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Degraded, message)
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Unhealthy, message)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_metadata(mut self, metadata: CheckMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Aggregate of every registered check from one registry run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub checks: Vec<CheckResult>,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
}

impl AggregateReport {
    /// Build a report whose status is the worst of its checks
    pub fn from_checks(version: impl Into<String>, checks: Vec<CheckResult>, duration: Duration) -> Self {
        let status = HealthStatus::worst_of(checks.iter().map(|c| c.status));
        Self {
            status,
            version: version.into(),
            timestamp: Utc::now(),
            checks,
            duration,
        }
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Checks that are not healthy
    pub fn failing_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.status.is_healthy())
    }
}
