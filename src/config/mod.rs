//! # Health Check Configuration
//!
//! Typed configuration for the orchestrator and the server binary. Values
//! are layered by [`ConfigManager`]: built-in defaults, then
//! `config/healthcheck.toml`, then `config/healthcheck.<env>.toml`, then
//! `HEALTHCHECK__*` environment variables (`__` separates sections, e.g.
//! `HEALTHCHECK__REGISTRY__CACHE_TTL_MS=0`).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use healthcheck_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let ttl = manager.config().registry.cache_ttl();
//! # let _ = ttl;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::{system, DependencyKind};
use crate::resilience::CircuitBreakerSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

fn millis(value: Duration) -> u64 {
    u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
}

/// Basic check registry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Aggregate report cache lifetime; 0 disables caching
    pub cache_ttl_ms: u64,
    /// Hard upper bound on one check run
    pub check_timeout_ms: u64,
    /// Version string reported in every report
    pub version: String,
}

impl RegistryConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: millis(system::DEFAULT_CACHE_TTL),
            check_timeout_ms: millis(system::DEFAULT_CHECK_TIMEOUT),
            version: system::DEFAULT_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependenciesConfig {
    /// Deadline for each dependency probe
    pub check_timeout_ms: u64,
}

impl DependenciesConfig {
    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            check_timeout_ms: millis(system::DEFAULT_DEPENDENCY_TIMEOUT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsBackend {
    #[default]
    Prometheus,
    Opentelemetry,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub backend: MetricsBackend,
    /// Series name prefix, e.g. `health` for `health_checks_total`
    pub prefix: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: MetricsBackend::Prometheus,
            prefix: system::DEFAULT_METRICS_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        self.bind_address.parse().map_err(|e| {
            ConfigurationError::invalid_value(
                "server.bind_address",
                self.bind_address.clone(),
                format!("not a socket address: {e}"),
            )
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A TCP reachability probe registered by the server binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpCheckConfig {
    pub name: String,
    pub address: String,
    #[serde(default = "TcpCheckConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Connect time above which the probe reports degraded
    #[serde(default)]
    pub degraded_after_ms: Option<u64>,
    /// Wrap the probe in a circuit breaker built from `[circuit_breaker]`
    #[serde(default = "TcpCheckConfig::default_true")]
    pub circuit_breaker: bool,
    /// Also register the probe as a dependency of this kind
    #[serde(default)]
    pub dependency: Option<DependencyKind>,
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl TcpCheckConfig {
    fn default_timeout_ms() -> u64 {
        2_000
    }

    fn default_true() -> bool {
        true
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub environment: String,
    pub registry: RegistryConfig,
    pub dependencies: DependenciesConfig,
    pub circuit_breaker: CircuitBreakerSettings,
    pub metrics: MetricsConfig,
    pub server: ServerConfig,
    pub checks: Vec<TcpCheckConfig>,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            registry: RegistryConfig::default(),
            dependencies: DependenciesConfig::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            metrics: MetricsConfig::default(),
            server: ServerConfig::default(),
            checks: Vec::new(),
        }
    }
}

impl HealthCheckConfig {
    /// Reject values that cannot work. Breaker settings are exempt; they are
    /// sanitized when breakers are built.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.registry.version.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "registry.version",
                "registry configuration",
            ));
        }

        if self.registry.check_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "registry.check_timeout_ms",
                "0",
                "hard check timeout must be greater than 0",
            ));
        }

        self.server.socket_addr()?;

        if self.metrics.enabled
            && !self
                .metrics
                .prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigurationError::invalid_value(
                "metrics.prefix",
                self.metrics.prefix.clone(),
                "prefix may only contain ASCII letters, digits and underscores",
            ));
        }

        let mut seen = HashSet::new();
        for check in &self.checks {
            if check.name.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field("checks.name", "TCP check"));
            }
            if check.address.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    format!("checks.{}.address", check.name),
                    "TCP check",
                ));
            }
            if !seen.insert(check.name.as_str()) {
                return Err(ConfigurationError::invalid_value(
                    "checks.name",
                    check.name.clone(),
                    "check names must be unique",
                ));
            }
        }

        Ok(())
    }
}
