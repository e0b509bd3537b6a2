//! End-to-end scenarios across registry, dependencies, breakers and
//! maintenance.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{fixed, uncached_orchestrator, ToggleChecker};
use healthcheck_core::constants::{CheckMode, DependencyKind, HealthStatus};
use healthcheck_core::dependencies::DependencyDescriptor;
use healthcheck_core::error::HealthError;
use healthcheck_core::resilience::{CircuitBreakerConfig, CircuitState};
use std::time::Duration;

#[tokio::test]
async fn test_critical_dependency_failure_propagates() {
    let orchestrator = uncached_orchestrator("3.1.0");
    orchestrator.register("api", fixed(HealthStatus::Healthy, "serving"));
    orchestrator.register("cache", fixed(HealthStatus::Degraded, "hit rate low"));

    orchestrator.register_dependency(
        DependencyDescriptor::new(
            "postgres",
            DependencyKind::Database,
            fixed(HealthStatus::Unhealthy, "connection refused"),
        )
        .critical(true),
    );
    orchestrator.register_dependency(
        DependencyDescriptor::new("redis", DependencyKind::Cache, fixed(HealthStatus::Healthy, "PONG"))
            .depends_on(["postgres"]),
    );

    let report = orchestrator.check(CheckMode::Standard).await;

    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert_eq!(report.version, "3.1.0");
    assert_eq!(report.checks.len(), 2);
    assert_eq!(report.check("cache").map(|c| c.status), Some(HealthStatus::Degraded));

    let order: Vec<&str> = report.dependencies.iter().map(|d| d.name()).collect();
    assert_eq!(order, vec!["postgres", "redis"]);

    let redis = report.dependency("redis").expect("redis reported");
    assert_eq!(redis.status(), HealthStatus::Degraded);
    assert_eq!(redis.result.message, "dependency 'postgres' is unhealthy");

    let critical: Vec<&str> = report.critical_failures().map(|d| d.name()).collect();
    assert_eq!(critical, vec!["postgres"]);
}

#[tokio::test]
async fn test_quick_mode_reports_only_basic_checks() {
    let orchestrator = uncached_orchestrator("3.1.0");
    orchestrator.register("api", fixed(HealthStatus::Healthy, "serving"));
    orchestrator.register_dependency(
        DependencyDescriptor::new(
            "postgres",
            DependencyKind::Database,
            fixed(HealthStatus::Unhealthy, "connection refused"),
        )
        .critical(true),
    );

    let quick = orchestrator.check(CheckMode::Quick).await;
    assert_eq!(quick.status, HealthStatus::Healthy);
    assert!(quick.dependencies.is_empty());

    let deep = orchestrator.check(CheckMode::Deep).await;
    assert_eq!(deep.status, HealthStatus::Unhealthy);
    assert_eq!(deep.dependencies.len(), 1);
}

#[tokio::test]
async fn test_maintenance_window_controls_status() {
    let orchestrator = uncached_orchestrator("3.1.0");
    orchestrator.register("api", fixed(HealthStatus::Healthy, "serving"));
    orchestrator.register_dependency(DependencyDescriptor::new(
        "redis",
        DependencyKind::Cache,
        fixed(HealthStatus::Healthy, "PONG"),
    ));

    orchestrator.set_maintenance_mode(true, "schema migration", None, None);

    let standard = orchestrator.check(CheckMode::Standard).await;
    assert_eq!(standard.status, HealthStatus::Degraded);
    assert_eq!(
        standard.maintenance.as_ref().map(|m| m.message.as_str()),
        Some("schema migration")
    );

    let maintenance = orchestrator.check(CheckMode::Maintenance).await;
    assert_eq!(maintenance.status, HealthStatus::Healthy);
    assert_eq!(maintenance.dependencies.len(), 1);

    orchestrator.set_maintenance_mode(false, "", None, None);
    let after = orchestrator.check(CheckMode::Standard).await;
    assert_eq!(after.status, HealthStatus::Healthy);
    assert!(after.maintenance.is_none());
}

#[tokio::test]
async fn test_maintenance_window_is_attached_with_schedule() {
    let orchestrator = uncached_orchestrator("3.1.0");
    orchestrator.register("api", fixed(HealthStatus::Healthy, "serving"));

    let start = Utc::now();
    let end = start + ChronoDuration::hours(2);
    orchestrator.set_maintenance_mode(true, "planned upgrade", Some(start), Some(end));

    let report = orchestrator.check(CheckMode::Quick).await;
    assert_eq!(report.status, HealthStatus::Degraded);
    let window = report.maintenance.expect("window attached");
    assert_eq!(window.start_time, Some(start));
    assert_eq!(window.end_time, Some(end));
}

#[tokio::test]
async fn test_breaker_trips_and_recovers_through_orchestrator() {
    let orchestrator = uncached_orchestrator("3.1.0");
    let payments = ToggleChecker::new(false);
    let config = CircuitBreakerConfig {
        failure_threshold: 2,
        success_threshold: 1,
        timeout: Duration::from_millis(50),
        max_half_open_requests: 1,
    };
    let breaker = orchestrator.register_with_circuit_breaker("payments", payments.clone(), config);

    orchestrator.check(CheckMode::Quick).await;
    orchestrator.check(CheckMode::Quick).await;
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(payments.invocations(), 2);

    let rejected = orchestrator.check(CheckMode::Quick).await;
    assert_eq!(payments.invocations(), 2);
    assert_eq!(rejected.check("payments").map(|c| c.status), Some(HealthStatus::Unhealthy));
    let record = rejected.circuit_breakers.get("payments").expect("breaker record");
    assert_eq!(record.state, CircuitState::Open);
    assert_eq!(record.total_rejections, 1);

    tokio::time::sleep(Duration::from_millis(80)).await;
    payments.set_healthy(true);

    let recovered = orchestrator.check(CheckMode::Quick).await;
    assert_eq!(recovered.status, HealthStatus::Healthy);
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(payments.invocations(), 3);
}

#[tokio::test]
async fn test_cyclic_dependencies_are_reported_and_skipped() {
    let orchestrator = uncached_orchestrator("3.1.0");
    orchestrator.register_dependency(
        DependencyDescriptor::new("orders", DependencyKind::Service, fixed(HealthStatus::Healthy, "ok"))
            .depends_on(["billing"]),
    );
    orchestrator.register_dependency(
        DependencyDescriptor::new("billing", DependencyKind::Service, fixed(HealthStatus::Healthy, "ok"))
            .depends_on(["orders"]),
    );

    assert!(matches!(
        orchestrator.validate_dependencies(),
        Err(HealthError::CycleDetected { .. })
    ));

    let report = orchestrator.check(CheckMode::Standard).await;
    assert!(report.dependencies.is_empty());
    assert_eq!(report.status, HealthStatus::Healthy);

    assert!(orchestrator.unregister_dependency("billing"));
    assert!(orchestrator.validate_dependencies().is_ok());
}

#[tokio::test]
async fn test_composite_report_serializes_for_consumers() {
    let orchestrator = uncached_orchestrator("3.1.0");
    orchestrator.register("api", fixed(HealthStatus::Healthy, "serving"));
    let _breaker = orchestrator.register_with_circuit_breaker(
        "search",
        fixed(HealthStatus::Healthy, "green"),
        CircuitBreakerConfig::for_external_api(),
    );

    let report = orchestrator.check(CheckMode::Deep).await;
    let json = serde_json::to_value(&report).expect("report serializes");

    assert_eq!(json["status"], "healthy");
    assert_eq!(json["mode"], "deep");
    assert_eq!(json["version"], "3.1.0");
    assert!(json["duration_ms"].is_u64());
    assert_eq!(json["circuit_breakers"]["search"]["state"], "closed");
    assert!(json["system_info"]["cpu_cores"].as_u64().unwrap_or(0) >= 1);
    assert_eq!(json["checks"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_unregister_removes_check_and_breaker() {
    let orchestrator = uncached_orchestrator("3.1.0");
    let _breaker = orchestrator.register_with_circuit_breaker(
        "ledger",
        fixed(HealthStatus::Unhealthy, "down"),
        CircuitBreakerConfig::default(),
    );
    assert_eq!(orchestrator.check_basic().await.status, HealthStatus::Unhealthy);

    assert!(orchestrator.unregister("ledger"));
    assert!(orchestrator.circuit_breakers().get("ledger").is_none());

    let report = orchestrator.check(CheckMode::Standard).await;
    assert!(report.checks.is_empty());
    assert!(report.circuit_breakers.is_empty());
    assert_eq!(report.status, HealthStatus::Healthy);
}
