//! # Metrics
//!
//! Every fresh check result, dependency status and breaker transition is
//! reported through a [`MetricsSink`]. Two backends are provided:
//!
//! - [`PrometheusMetricsSink`]: pull-based; [`MetricsSink::render`] yields
//!   the text exposition format served on `/metrics`
//! - [`OpenTelemetryMetricsSink`]: push-based; records on instruments from
//!   the globally installed meter provider
//!
//! Series (prefix configurable, default `health`):
//!
//! | Series | Type | Labels |
//! |---|---|---|
//! | `*_checks_total` | counter | check_name, status |
//! | `*_check_errors_total` | counter | check_name, error_type |
//! | `*_circuit_trips_total` | counter | circuit_name, reason |
//! | `*_check_duration_seconds` | histogram | check_name |
//! | `*_check_duration_summary_seconds` | summary | check_name |
//! | `*_status` | gauge (2/1/0) | check_name |
//! | `*_dependency_status` | gauge (2/1/0) | dependency_name |
//! | `*_circuit_breaker_state` | gauge (0/1/2) | circuit_name |

pub mod opentelemetry;
pub mod prometheus;

pub use self::opentelemetry::OpenTelemetryMetricsSink;
pub use self::prometheus::PrometheusMetricsSink;

use crate::config::{MetricsBackend, MetricsConfig};
use crate::constants::{system, HealthStatus};
use crate::error::Result;
use crate::resilience::CircuitState;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Histogram buckets for check durations, in seconds
pub const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Destination for health metrics.
///
/// Implementations must be cheap and non-blocking; they are called inline
/// on the check path.
pub trait MetricsSink: Send + Sync + fmt::Debug {
    fn record_check(&self, name: &str, status: HealthStatus, duration: Duration);

    fn record_check_error(&self, name: &str, error_type: &str);

    fn record_dependency(&self, name: &str, status: HealthStatus);

    fn record_circuit_state(&self, name: &str, state: CircuitState);

    fn record_circuit_trip(&self, name: &str, reason: &str);

    /// Text exposition for pull-based sinks
    fn render(&self) -> Option<String> {
        None
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record_check(&self, _name: &str, _status: HealthStatus, _duration: Duration) {}

    fn record_check_error(&self, _name: &str, _error_type: &str) {}

    fn record_dependency(&self, _name: &str, _status: HealthStatus) {}

    fn record_circuit_state(&self, _name: &str, _state: CircuitState) {}

    fn record_circuit_trip(&self, _name: &str, _reason: &str) {}
}

/// Build the sink the configuration selects
pub fn from_config(config: &MetricsConfig) -> Result<Arc<dyn MetricsSink>> {
    if !config.enabled {
        return Ok(Arc::new(NoopMetricsSink));
    }

    let sink: Arc<dyn MetricsSink> = match config.backend {
        MetricsBackend::Prometheus => Arc::new(PrometheusMetricsSink::new(&config.prefix)?),
        MetricsBackend::Opentelemetry => Arc::new(OpenTelemetryMetricsSink::new(&config.prefix)),
        MetricsBackend::None => Arc::new(NoopMetricsSink),
    };
    Ok(sink)
}

/// Fully qualified series names for one prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricNames {
    pub checks_total: String,
    pub check_errors_total: String,
    pub circuit_trips_total: String,
    pub check_duration: String,
    pub check_duration_summary: String,
    pub status: String,
    pub dependency_status: String,
    pub circuit_breaker_state: String,
}

impl MetricNames {
    /// An empty prefix falls back to the default
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim().trim_end_matches('_');
        let prefix = if prefix.is_empty() {
            system::DEFAULT_METRICS_PREFIX
        } else {
            prefix
        };

        Self {
            checks_total: format!("{prefix}_checks_total"),
            check_errors_total: format!("{prefix}_check_errors_total"),
            circuit_trips_total: format!("{prefix}_circuit_trips_total"),
            check_duration: format!("{prefix}_check_duration_seconds"),
            check_duration_summary: format!("{prefix}_check_duration_summary_seconds"),
            status: format!("{prefix}_status"),
            dependency_status: format!("{prefix}_dependency_status"),
            circuit_breaker_state: format!("{prefix}_circuit_breaker_state"),
        }
    }
}

impl Default for MetricNames {
    fn default() -> Self {
        Self::new(system::DEFAULT_METRICS_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_use_prefix() {
        let names = MetricNames::new("myapp_");
        assert_eq!(names.checks_total, "myapp_checks_total");
        assert_eq!(names.circuit_breaker_state, "myapp_circuit_breaker_state");

        assert_eq!(MetricNames::new("  ").status, "health_status");
        assert_eq!(MetricNames::default(), MetricNames::new("health"));
    }

    #[test]
    fn test_sink_selection_from_config() {
        let prometheus = from_config(&MetricsConfig::default()).unwrap();
        assert!(prometheus.render().is_some());

        let disabled = from_config(&MetricsConfig {
            enabled: false,
            ..Default::default()
        })
        .unwrap();
        assert!(disabled.render().is_none());

        let otel = from_config(&MetricsConfig {
            backend: MetricsBackend::Opentelemetry,
            ..Default::default()
        })
        .unwrap();
        assert!(otel.render().is_none());
    }

    #[test]
    fn test_noop_sink_renders_nothing() {
        let sink = NoopMetricsSink;
        sink.record_check("api", HealthStatus::Healthy, Duration::from_millis(3));
        sink.record_circuit_trip("api", "failure_threshold");
        assert!(sink.render().is_none());
    }
}
