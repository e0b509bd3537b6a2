#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Health Check Core
//!
//! Health-check orchestration for long-running services.
//!
//! ## Overview
//!
//! A service registers named probes; the core runs them concurrently under
//! a shared deadline, caches the aggregate report, shields failing
//! resources behind circuit breakers, orders dependencies topologically
//! and folds everything into a composite status for liveness, readiness
//! and diagnostics endpoints.
//!
//! ## Module Organization
//!
//! - [`health`] - checker capability, built-in probes and the cached registry
//! - [`resilience`] - circuit breakers and their registry
//! - [`dependencies`] - dependency graph and critical-failure propagation
//! - [`orchestrator`] - composite reports, check modes and maintenance
//! - [`metrics`] - Prometheus and OpenTelemetry sinks
//! - [`web`] - axum routes for the health endpoints
//! - [`config`] - layered configuration
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use healthcheck_core::constants::CheckMode;
//! use healthcheck_core::health::StaticChecker;
//! use healthcheck_core::orchestrator::HealthOrchestrator;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let orchestrator = HealthOrchestrator::new("1.0.0");
//! orchestrator.register("api", Arc::new(StaticChecker::healthy()));
//!
//! let report = orchestrator.check(CheckMode::Quick).await;
//! assert!(report.is_healthy());
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod dependencies;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod resilience;
pub mod utils;
pub mod web;

pub use config::{ConfigManager, ConfigurationError, HealthCheckConfig};
pub use constants::{CheckMode, DependencyKind, HealthStatus};
pub use dependencies::{DependencyDescriptor, DependencyGraph, DependencyManager, DependencyStatus};
pub use error::{CheckError, HealthError, Result};
pub use health::{AggregateReport, CheckMetadata, CheckResult, Checker, HealthRegistry};
pub use metrics::{MetricsSink, NoopMetricsSink, OpenTelemetryMetricsSink, PrometheusMetricsSink};
pub use orchestrator::{CompositeReport, HealthOrchestrator};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerRecord,
    CircuitBreakerRegistry, CircuitState,
};
