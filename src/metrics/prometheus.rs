//! Pull-based sink backed by a process-local Prometheus recorder.
//!
//! The recorder is never installed globally, so several sinks (one per
//! orchestrator, or one per test) can coexist without sharing series.

use super::{MetricNames, MetricsSink, DURATION_BUCKETS};
use crate::constants::HealthStatus;
use crate::error::{HealthError, Result};
use crate::resilience::CircuitState;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::fmt;
use std::time::Duration;
use tracing::info;

pub struct PrometheusMetricsSink {
    /// `None` when metrics are disabled; every call is then a no-op
    recorder: Option<PrometheusRecorder>,
    handle: Option<PrometheusHandle>,
    names: MetricNames,
}

impl PrometheusMetricsSink {
    pub fn new(prefix: &str) -> Result<Self> {
        let names = MetricNames::new(prefix);

        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(names.check_duration.clone()), DURATION_BUCKETS)
            .map_err(|e| HealthError::Metrics(format!("invalid histogram buckets: {e}")))?
            .build_recorder();
        let handle = recorder.handle();

        info!(prefix = %names.checks_total.trim_end_matches("_checks_total"), "Prometheus metrics sink initialized");

        Ok(Self {
            recorder: Some(recorder),
            handle: Some(handle),
            names,
        })
    }

    /// A sink that records nothing and renders nothing
    pub fn disabled() -> Self {
        Self {
            recorder: None,
            handle: None,
            names: MetricNames::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn names(&self) -> &MetricNames {
        &self.names
    }

    fn with_recorder(&self, record: impl FnOnce(&MetricNames)) {
        if let Some(recorder) = &self.recorder {
            metrics::with_local_recorder(recorder, || record(&self.names));
        }
    }
}

impl MetricsSink for PrometheusMetricsSink {
    fn record_check(&self, name: &str, status: HealthStatus, duration: Duration) {
        self.with_recorder(|names| {
            counter!(
                names.checks_total.clone(),
                "check_name" => name.to_string(),
                "status" => status.as_str()
            )
            .increment(1);
            histogram!(names.check_duration.clone(), "check_name" => name.to_string())
                .record(duration.as_secs_f64());
            histogram!(names.check_duration_summary.clone(), "check_name" => name.to_string())
                .record(duration.as_secs_f64());
            gauge!(names.status.clone(), "check_name" => name.to_string()).set(status.gauge_value());
        });
    }

    fn record_check_error(&self, name: &str, error_type: &str) {
        self.with_recorder(|names| {
            counter!(
                names.check_errors_total.clone(),
                "check_name" => name.to_string(),
                "error_type" => error_type.to_string()
            )
            .increment(1);
        });
    }

    fn record_dependency(&self, name: &str, status: HealthStatus) {
        self.with_recorder(|names| {
            gauge!(names.dependency_status.clone(), "dependency_name" => name.to_string())
                .set(status.gauge_value());
        });
    }

    fn record_circuit_state(&self, name: &str, state: CircuitState) {
        self.with_recorder(|names| {
            gauge!(names.circuit_breaker_state.clone(), "circuit_name" => name.to_string())
                .set(state.gauge_value());
        });
    }

    fn record_circuit_trip(&self, name: &str, reason: &str) {
        self.with_recorder(|names| {
            counter!(
                names.circuit_trips_total.clone(),
                "circuit_name" => name.to_string(),
                "reason" => reason.to_string()
            )
            .increment(1);
        });
    }

    fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

impl fmt::Debug for PrometheusMetricsSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrometheusMetricsSink")
            .field("enabled", &self.is_enabled())
            .field("names", &self.names)
            .finish()
    }
}
