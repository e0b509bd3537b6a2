//! Push-based sink recording on OpenTelemetry instruments.
//!
//! Instruments come from the global meter provider, so whatever exporter
//! the embedding application installed receives the series.

use super::{MetricNames, MetricsSink};
use crate::constants::HealthStatus;
use crate::resilience::CircuitState;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use opentelemetry::KeyValue;
use std::fmt;
use std::time::Duration;

const METER_NAME: &str = "healthcheck-core";

pub struct OpenTelemetryMetricsSink {
    names: MetricNames,
    checks_total: Counter<u64>,
    check_errors_total: Counter<u64>,
    circuit_trips_total: Counter<u64>,
    check_duration: Histogram<f64>,
    status: Gauge<f64>,
    dependency_status: Gauge<f64>,
    circuit_breaker_state: Gauge<f64>,
}

impl OpenTelemetryMetricsSink {
    pub fn new(prefix: &str) -> Self {
        Self::with_meter(&opentelemetry::global::meter(METER_NAME), prefix)
    }

    pub fn with_meter(meter: &Meter, prefix: &str) -> Self {
        let names = MetricNames::new(prefix);

        Self {
            checks_total: meter
                .u64_counter(names.checks_total.clone())
                .with_description("Total number of health check executions")
                .build(),
            check_errors_total: meter
                .u64_counter(names.check_errors_total.clone())
                .with_description("Total number of health check errors")
                .build(),
            circuit_trips_total: meter
                .u64_counter(names.circuit_trips_total.clone())
                .with_description("Total number of circuit breaker trips")
                .build(),
            check_duration: meter
                .f64_histogram(names.check_duration.clone())
                .with_description("Health check duration in seconds")
                .with_unit("s")
                .build(),
            status: meter
                .f64_gauge(names.status.clone())
                .with_description("Health check status (2=healthy, 1=degraded, 0=unhealthy)")
                .build(),
            dependency_status: meter
                .f64_gauge(names.dependency_status.clone())
                .with_description("Dependency status (2=healthy, 1=degraded, 0=unhealthy)")
                .build(),
            circuit_breaker_state: meter
                .f64_gauge(names.circuit_breaker_state.clone())
                .with_description("Circuit breaker state (0=closed, 1=half-open, 2=open)")
                .build(),
            names,
        }
    }
}

impl MetricsSink for OpenTelemetryMetricsSink {
    fn record_check(&self, name: &str, status: HealthStatus, duration: Duration) {
        let check = KeyValue::new("check_name", name.to_string());
        self.checks_total
            .add(1, &[check.clone(), KeyValue::new("status", status.as_str())]);
        self.check_duration
            .record(duration.as_secs_f64(), &[check.clone()]);
        self.status.record(status.gauge_value(), &[check]);
    }

    fn record_check_error(&self, name: &str, error_type: &str) {
        self.check_errors_total.add(
            1,
            &[
                KeyValue::new("check_name", name.to_string()),
                KeyValue::new("error_type", error_type.to_string()),
            ],
        );
    }

    fn record_dependency(&self, name: &str, status: HealthStatus) {
        self.dependency_status.record(
            status.gauge_value(),
            &[KeyValue::new("dependency_name", name.to_string())],
        );
    }

    fn record_circuit_state(&self, name: &str, state: CircuitState) {
        self.circuit_breaker_state.record(
            state.gauge_value(),
            &[KeyValue::new("circuit_name", name.to_string())],
        );
    }

    fn record_circuit_trip(&self, name: &str, reason: &str) {
        self.circuit_trips_total.add(
            1,
            &[
                KeyValue::new("circuit_name", name.to_string()),
                KeyValue::new("reason", reason.to_string()),
            ],
        );
    }
}

impl fmt::Debug for OpenTelemetryMetricsSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenTelemetryMetricsSink")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}
