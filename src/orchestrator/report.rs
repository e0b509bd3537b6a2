//! Report shapes produced by the orchestrator.

use crate::constants::{CheckMode, HealthStatus};
use crate::dependencies::DependencyStatus;
use crate::health::CheckResult;
use crate::orchestrator::{MaintenanceWindow, SystemInfo};
use crate::resilience::CircuitBreakerRecord;
use crate::utils::serde::duration_ms;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Full picture of the service: basic checks, dependencies in topological
/// order, breakers, maintenance and host information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeReport {
    pub status: HealthStatus,
    pub mode: CheckMode,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub checks: Vec<CheckResult>,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    pub dependencies: Vec<DependencyStatus>,
    pub circuit_breakers: BTreeMap<String, CircuitBreakerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceWindow>,
    pub system_info: SystemInfo,
}

impl CompositeReport {
    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|check| check.name == name)
    }

    pub fn dependency(&self, name: &str) -> Option<&DependencyStatus> {
        self.dependencies.iter().find(|dep| dep.name() == name)
    }

    pub fn critical_failures(&self) -> impl Iterator<Item = &DependencyStatus> {
        self.dependencies.iter().filter(|dep| dep.is_critical_failure())
    }
}

/// Fold the composite status. Later rules win:
///
/// 1. worst basic check status
/// 2. maintenance: degraded, or healthy in maintenance mode
/// 3. any critical unhealthy dependency: unhealthy
pub fn composite_status(
    base: HealthStatus,
    mode: CheckMode,
    maintenance: Option<&MaintenanceWindow>,
    dependencies: &[DependencyStatus],
) -> HealthStatus {
    let mut status = base;

    if maintenance.is_some() {
        status = if mode == CheckMode::Maintenance {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
    }

    if dependencies.iter().any(DependencyStatus::is_critical_failure) {
        status = HealthStatus::Unhealthy;
    }

    status
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessReport {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl LivenessReport {
    pub fn alive() -> Self {
        Self {
            status: "alive".to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Checks that are not healthy; empty when ready
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<CheckResult>,
}

impl ReadinessReport {
    pub fn ready() -> Self {
        Self {
            ready: true,
            status: "ready".to_string(),
            timestamp: Utc::now(),
            reason: None,
            checks: Vec::new(),
        }
    }

    pub fn not_ready(reason: impl Into<String>, checks: Vec<CheckResult>) -> Self {
        Self {
            ready: false,
            status: "not_ready".to_string(),
            timestamp: Utc::now(),
            reason: Some(reason.into()),
            checks,
        }
    }
}
