//! # System Constants
//!
//! Core enums and default values that define the operational boundaries of
//! the health-check orchestration core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default values shared by the registry, dependency manager and breakers
pub mod system {
    use super::Duration;

    /// Hard upper bound for one registry check run
    pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
    /// Time-to-live of a cached aggregate report
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);
    /// Per-dependency timeout used by the dependency manager
    pub const DEFAULT_DEPENDENCY_TIMEOUT: Duration = Duration::from_secs(5);
    /// Reported version when none is configured
    pub const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");
    /// Metric name prefix
    pub const DEFAULT_METRICS_PREFIX: &str = "health";
}

/// Health of a single check, a dependency or the whole system.
///
/// Variants are declared in severity order so `Ord` can fold them:
/// `Healthy < Degraded < Unhealthy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }

    /// The more severe of two statuses
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        self.max(other)
    }

    /// Fold any number of statuses; an empty set is healthy
    pub fn worst_of<I>(statuses: I) -> HealthStatus
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses
            .into_iter()
            .fold(HealthStatus::Healthy, HealthStatus::worst)
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Healthy and degraded systems still serve traffic
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    /// Gauge encoding: 2=healthy, 1=degraded, 0=unhealthy
    pub fn gauge_value(&self) -> f64 {
        match self {
            HealthStatus::Healthy => 2.0,
            HealthStatus::Degraded => 1.0,
            HealthStatus::Unhealthy => 0.0,
        }
    }

    /// Gauge value for a status that may not have been observed yet
    pub fn gauge_value_of(status: Option<HealthStatus>) -> f64 {
        status.map_or(-1.0, |s| s.gauge_value())
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much work a composite check performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// Registry checks only, dependencies skipped
    Quick,
    /// Registry checks and dependency checks
    #[default]
    Standard,
    /// Same work as standard
    Deep,
    /// Same work as standard; maintenance reports healthy instead of degraded
    Maintenance,
}

impl CheckMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckMode::Quick => "quick",
            CheckMode::Standard => "standard",
            CheckMode::Deep => "deep",
            CheckMode::Maintenance => "maintenance",
        }
    }

    pub fn includes_dependencies(&self) -> bool {
        !matches!(self, CheckMode::Quick)
    }
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quick" => Ok(CheckMode::Quick),
            "standard" => Ok(CheckMode::Standard),
            "deep" => Ok(CheckMode::Deep),
            "maintenance" => Ok(CheckMode::Maintenance),
            other => Err(format!("unknown check mode: {other}")),
        }
    }
}

/// What kind of resource a dependency is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Database,
    Cache,
    Queue,
    ExternalApi,
    Filesystem,
    Network,
    Service,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Database => "database",
            DependencyKind::Cache => "cache",
            DependencyKind::Queue => "queue",
            DependencyKind::ExternalApi => "external_api",
            DependencyKind::Filesystem => "filesystem",
            DependencyKind::Network => "network",
            DependencyKind::Service => "service",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
