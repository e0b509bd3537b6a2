//! # Web API Route Definitions

use crate::web::handlers;
use crate::web::state::AppState;
use axum::routing::get;
use axum::Router;

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::basic_health))
        .route("/health/live", get(handlers::health::liveness_probe))
        .route("/health/ready", get(handlers::health::readiness_probe))
        .route("/health/detailed", get(handlers::health::detailed_health))
}

pub fn metrics_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(handlers::metrics::prometheus_metrics))
}

/// Complete router with state attached
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(metrics_routes())
        .with_state(state)
}
