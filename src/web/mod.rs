//! # Web API
//!
//! HTTP surface over a [`HealthOrchestrator`](crate::orchestrator::HealthOrchestrator):
//!
//! | Route | Success | Failure |
//! |---|---|---|
//! | `GET /health/live` | 200 `alive` | never |
//! | `GET /health/ready` | 200 `ready` | 503 `not_ready` |
//! | `GET /health` | 200 healthy report | 503 |
//! | `GET /health/detailed?mode=` | 200 composite report | 503 when unhealthy |
//! | `GET /metrics` | 200 Prometheus text | 404 without a Prometheus sink |

pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use errors::ApiError;
pub use routes::create_router;
pub use state::AppState;
