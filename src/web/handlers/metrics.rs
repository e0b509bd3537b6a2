//! # Metrics Handlers

use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;
use axum::extract::State;
use axum::http::header;
use tracing::debug;

/// Prometheus metrics endpoint: GET /metrics
pub async fn prometheus_metrics(
    State(state): State<AppState>,
) -> ApiResult<([(header::HeaderName, &'static str); 1], String)> {
    debug!("Serving Prometheus metrics");

    let body = state
        .orchestrator()
        .metrics()
        .render()
        .ok_or_else(|| ApiError::NotFound("no pull-based metrics sink configured".to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
