//! # Health Check Handlers
//!
//! Kubernetes-compatible health check endpoints for monitoring and load balancing.

use crate::constants::{CheckMode, HealthStatus};
use crate::health::AggregateReport;
use crate::orchestrator::{CompositeReport, LivenessReport, ReadinessReport};
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct DetailedQuery {
    pub mode: Option<String>,
}

/// Kubernetes liveness probe: GET /health/live
///
/// Always 200 while the process can serve requests.
pub async fn liveness_probe(State(state): State<AppState>) -> Json<LivenessReport> {
    Json(state.orchestrator().liveness())
}

/// Kubernetes readiness probe: GET /health/ready
pub async fn readiness_probe(State(state): State<AppState>) -> (StatusCode, Json<ReadinessReport>) {
    debug!("Performing readiness probe");

    let report = state.orchestrator().readiness().await;
    let code = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

/// Basic checks: GET /health
///
/// 200 only when every basic check is healthy.
pub async fn basic_health(State(state): State<AppState>) -> (StatusCode, Json<AggregateReport>) {
    let report = state.orchestrator().check_basic().await;
    let code = if report.status == HealthStatus::Healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

/// Composite report: GET /health/detailed?mode=quick|standard|deep|maintenance
///
/// 200 unless the composite status is unhealthy.
pub async fn detailed_health(
    State(state): State<AppState>,
    Query(query): Query<DetailedQuery>,
) -> ApiResult<(StatusCode, Json<CompositeReport>)> {
    let mode = match query.mode.as_deref() {
        None | Some("") => CheckMode::default(),
        Some(raw) => raw.parse::<CheckMode>().map_err(ApiError::BadRequest)?,
    };
    debug!(mode = %mode, "Performing detailed health check");

    let report = state.orchestrator().check(mode).await;
    let code = if report.status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    Ok((code, Json(report)))
}
