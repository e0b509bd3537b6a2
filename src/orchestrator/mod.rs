//! # Health Orchestrator
//!
//! Composes the basic check registry, the dependency manager and the
//! circuit breakers into one service-level view.
//!
//! ## Status precedence
//!
//! Lowest to highest: the worst basic check, then maintenance (degraded, or
//! healthy when checking in [`CheckMode::Maintenance`]), then any critical
//! dependency that is unhealthy, which always makes the report unhealthy.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use healthcheck_core::constants::{CheckMode, DependencyKind};
//! use healthcheck_core::dependencies::DependencyDescriptor;
//! use healthcheck_core::health::TcpChecker;
//! use healthcheck_core::orchestrator::HealthOrchestrator;
//! use healthcheck_core::resilience::CircuitBreakerConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let orchestrator = HealthOrchestrator::new("1.4.0");
//!
//! let postgres = Arc::new(TcpChecker::new("127.0.0.1:5432", Duration::from_secs(2)));
//! orchestrator.register_with_circuit_breaker("postgres", postgres.clone(), CircuitBreakerConfig::for_database());
//! orchestrator.register_dependency(
//!     DependencyDescriptor::new("postgres", DependencyKind::Database, postgres).critical(true),
//! );
//!
//! let report = orchestrator.check(CheckMode::Standard).await;
//! println!("{}", report.status);
//! # }
//! ```

pub mod breaker_checker;
pub mod maintenance;
pub mod report;
pub mod system_info;

pub use breaker_checker::CircuitBreakerChecker;
pub use maintenance::MaintenanceWindow;
pub use report::{composite_status, CompositeReport, LivenessReport, ReadinessReport};
pub use system_info::{MemoryInfo, SystemInfo};

use crate::config::HealthCheckConfig;
use crate::constants::{CheckMode, HealthStatus};
use crate::dependencies::{DependencyDescriptor, DependencyManager};
use crate::error::Result;
use crate::health::{AggregateReport, Checker, HealthRegistry};
use crate::metrics::{self as sinks, MetricsSink, NoopMetricsSink};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub struct HealthOrchestrator {
    registry: HealthRegistry,
    dependencies: DependencyManager,
    breakers: CircuitBreakerRegistry,
    maintenance: RwLock<MaintenanceWindow>,
    metrics: Arc<dyn MetricsSink>,
    started_at: Instant,
    environment: String,
}

impl HealthOrchestrator {
    /// Orchestrator with default settings and no metrics
    pub fn new(version: impl Into<String>) -> Self {
        let mut config = HealthCheckConfig::default();
        config.registry.version = version.into();
        Self::with_metrics(&config, Arc::new(NoopMetricsSink))
    }

    /// Orchestrator with the metrics backend the configuration selects
    pub fn from_config(config: &HealthCheckConfig) -> Result<Self> {
        let metrics = sinks::from_config(&config.metrics)?;
        Ok(Self::with_metrics(config, metrics))
    }

    pub fn with_metrics(config: &HealthCheckConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        let breakers = CircuitBreakerRegistry::new(config.circuit_breaker.to_breaker_config())
            .with_state_change_callback(transition_recorder(Arc::clone(&metrics)));

        info!(
            version = %config.registry.version,
            environment = %config.environment,
            metrics = ?metrics,
            "Health orchestrator initialized"
        );

        Self {
            registry: HealthRegistry::from_config(&config.registry).with_metrics(Arc::clone(&metrics)),
            dependencies: DependencyManager::from_config(&config.dependencies)
                .with_metrics(Arc::clone(&metrics)),
            breakers,
            maintenance: RwLock::new(MaintenanceWindow::default()),
            metrics,
            started_at: Instant::now(),
            environment: config.environment.clone(),
        }
    }

    pub fn version(&self) -> &str {
        self.registry.version()
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn registry(&self) -> &HealthRegistry {
        &self.registry
    }

    pub fn dependencies(&self) -> &DependencyManager {
        &self.dependencies
    }

    pub fn circuit_breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    pub fn metrics(&self) -> &Arc<dyn MetricsSink> {
        &self.metrics
    }

    pub fn register(&self, name: impl Into<String>, checker: Arc<dyn Checker>) {
        self.registry.register(name, checker);
    }

    /// Wrap `checker` in a fresh breaker and register it under `name`.
    /// Any breaker previously registered under the name is replaced.
    pub fn register_with_circuit_breaker(
        &self,
        name: &str,
        checker: Arc<dyn Checker>,
        config: CircuitBreakerConfig,
    ) -> Arc<CircuitBreaker> {
        let breaker = self.breakers.replace(name, config);
        self.metrics.record_circuit_state(name, breaker.state());

        self.registry.register(
            name,
            Arc::new(CircuitBreakerChecker::new(checker, Arc::clone(&breaker))),
        );
        breaker
    }

    pub fn register_dependency(&self, descriptor: DependencyDescriptor) {
        self.dependencies.register(descriptor);
    }

    /// Remove a basic check and its breaker, if any
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.registry.unregister(name);
        self.breakers.remove(name);
        removed
    }

    pub fn unregister_dependency(&self, name: &str) -> bool {
        self.dependencies.unregister(name)
    }

    pub fn validate_dependencies(&self) -> Result<()> {
        self.dependencies.validate_graph()
    }

    pub fn set_maintenance_mode(
        &self,
        enabled: bool,
        message: impl Into<String>,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) {
        let window = MaintenanceWindow::new(enabled, message, start_time, end_time);
        if enabled {
            warn!(message = %window.message, start = ?start_time, end = ?end_time, "Maintenance mode enabled");
        } else {
            info!("Maintenance mode disabled");
        }
        *self.maintenance.write() = window;
    }

    pub fn maintenance(&self) -> MaintenanceWindow {
        self.maintenance.read().clone()
    }

    pub fn set_cache_ttl(&self, ttl: Duration) {
        self.registry.set_cache_ttl(ttl);
    }

    /// Basic checks only, through the registry cache
    pub async fn check_basic(&self) -> AggregateReport {
        self.registry.check().await
    }

    pub async fn check(&self, mode: CheckMode) -> CompositeReport {
        let started = Instant::now();

        let base = self.registry.check().await;
        let dependencies = if mode.includes_dependencies() {
            self.dependencies.check_all().await
        } else {
            Vec::new()
        };
        let circuit_breakers = self.breakers.records().await;
        let maintenance = self.maintenance.read().active().cloned();

        let status = composite_status(base.status, mode, maintenance.as_ref(), &dependencies);

        if !status.is_healthy() {
            warn!(
                mode = %mode,
                status = %status,
                base_status = %base.status,
                critical_failures = dependencies.iter().filter(|d| d.is_critical_failure()).count(),
                maintenance = maintenance.is_some(),
                "Composite health check is not healthy"
            );
        }

        CompositeReport {
            status,
            mode,
            version: base.version,
            timestamp: Utc::now(),
            checks: base.checks,
            duration: started.elapsed(),
            dependencies,
            circuit_breakers,
            maintenance,
            system_info: SystemInfo::capture(self.started_at, &self.environment, self.registry.version()),
        }
    }

    pub fn liveness(&self) -> LivenessReport {
        LivenessReport::alive()
    }

    /// Ready when every basic check is healthy
    pub async fn readiness(&self) -> ReadinessReport {
        let report = self.registry.check().await;
        if report.status == HealthStatus::Healthy {
            return ReadinessReport::ready();
        }

        let failing: Vec<_> = report.failing_checks().cloned().collect();
        ReadinessReport::not_ready(
            format!("{} check(s) not healthy; overall status {}", failing.len(), report.status),
            failing,
        )
    }
}

impl fmt::Debug for HealthOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthOrchestrator")
            .field("registry", &self.registry)
            .field("dependencies", &self.dependencies)
            .field("breakers", &self.breakers)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

/// Feed breaker transitions into the metrics sink
fn transition_recorder(
    metrics: Arc<dyn MetricsSink>,
) -> Arc<dyn Fn(&str, CircuitState, CircuitState) + Send + Sync> {
    Arc::new(move |name: &str, from: CircuitState, to: CircuitState| {
        metrics.record_circuit_state(name, to);
        if to == CircuitState::Open {
            let reason = match from {
                CircuitState::HalfOpen => "half_open_failure",
                _ => "failure_threshold",
            };
            metrics.record_circuit_trip(name, reason);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DependencyKind;
    use crate::health::StaticChecker;
    use crate::metrics::PrometheusMetricsSink;

    fn orchestrator() -> HealthOrchestrator {
        let orchestrator = HealthOrchestrator::new("2.0.0");
        orchestrator.set_cache_ttl(Duration::ZERO);
        orchestrator
    }

    #[tokio::test]
    async fn test_quick_mode_skips_dependencies() {
        let orchestrator = orchestrator();
        orchestrator.register("api", Arc::new(StaticChecker::healthy()));
        orchestrator.register_dependency(
            DependencyDescriptor::new(
                "postgres",
                DependencyKind::Database,
                Arc::new(StaticChecker::new(HealthStatus::Unhealthy, "down")),
            )
            .critical(true),
        );

        let quick = orchestrator.check(CheckMode::Quick).await;
        assert_eq!(quick.status, HealthStatus::Healthy);
        assert!(quick.dependencies.is_empty());

        let standard = orchestrator.check(CheckMode::Standard).await;
        assert_eq!(standard.status, HealthStatus::Unhealthy);
        assert_eq!(standard.critical_failures().count(), 1);

        let deep = orchestrator.check(CheckMode::Deep).await;
        assert_eq!(deep.status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_maintenance_modes() {
        let orchestrator = orchestrator();
        orchestrator.register("api", Arc::new(StaticChecker::healthy()));
        orchestrator.set_maintenance_mode(true, "upgrading", Some(Utc::now()), None);

        let standard = orchestrator.check(CheckMode::Standard).await;
        assert_eq!(standard.status, HealthStatus::Degraded);
        assert_eq!(standard.maintenance.as_ref().map(|m| m.message.as_str()), Some("upgrading"));

        let maintenance = orchestrator.check(CheckMode::Maintenance).await;
        assert_eq!(maintenance.status, HealthStatus::Healthy);
        assert!(maintenance.maintenance.is_some());

        orchestrator.set_maintenance_mode(false, "", None, None);
        let after = orchestrator.check(CheckMode::Standard).await;
        assert_eq!(after.status, HealthStatus::Healthy);
        assert!(after.maintenance.is_none());
    }

    #[tokio::test]
    async fn test_breaker_transitions_reach_metrics() {
        let sink = Arc::new(PrometheusMetricsSink::new("health").unwrap());
        let orchestrator =
            HealthOrchestrator::with_metrics(&HealthCheckConfig::default(), sink.clone());
        orchestrator.set_cache_ttl(Duration::ZERO);

        orchestrator.register_with_circuit_breaker(
            "db",
            Arc::new(StaticChecker::new(HealthStatus::Unhealthy, "refused")),
            CircuitBreakerConfig {
                failure_threshold: 1,
                success_threshold: 1,
                timeout: Duration::from_secs(60),
                max_half_open_requests: 1,
            },
        );

        let report = orchestrator.check(CheckMode::Quick).await;
        assert_eq!(report.circuit_breakers["db"].state, CircuitState::Open);

        let rendered = sink.render().unwrap();
        assert!(rendered.contains("health_circuit_trips_total"));
        assert!(rendered.contains("reason=\"failure_threshold\""));
        assert!(rendered.contains("health_circuit_breaker_state"));
    }

    #[tokio::test]
    async fn test_readiness_reports_failing_checks() {
        let orchestrator = orchestrator();
        assert!(orchestrator.readiness().await.ready);

        orchestrator.register("db", Arc::new(StaticChecker::new(HealthStatus::Degraded, "slow")));
        let readiness = orchestrator.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.status, "not_ready");
        assert_eq!(readiness.checks.len(), 1);
        assert_eq!(orchestrator.liveness().status, "alive");
    }

    #[tokio::test]
    async fn test_unregister_removes_breaker() {
        let orchestrator = orchestrator();
        orchestrator.register_with_circuit_breaker(
            "db",
            Arc::new(StaticChecker::healthy()),
            CircuitBreakerConfig::for_database(),
        );
        assert_eq!(orchestrator.circuit_breakers().len(), 1);

        assert!(orchestrator.unregister("db"));
        assert!(orchestrator.circuit_breakers().is_empty());
        assert!(orchestrator.registry().is_empty());
    }
}
