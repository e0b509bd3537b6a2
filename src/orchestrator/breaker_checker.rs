//! Checker wrapper that routes every probe through a circuit breaker.

use crate::constants::HealthStatus;
use crate::error::CheckError;
use crate::health::{CheckMetadata, CheckResult, Checker};
use crate::resilience::{CircuitBreaker, CircuitBreakerError};
use async_trait::async_trait;
use std::sync::Arc;

/// Why a protected probe counted as a breaker failure
enum ProbeFailure {
    Unhealthy(CheckResult),
    Error(CheckError),
}

/// Runs the inner checker via [`CircuitBreaker::execute`].
///
/// An unhealthy result or an error counts as a breaker failure; degraded
/// counts as success. Failures and rejections come back as unhealthy
/// results carrying the breaker's state.
pub struct CircuitBreakerChecker {
    inner: Arc<dyn Checker>,
    breaker: Arc<CircuitBreaker>,
}

impl CircuitBreakerChecker {
    pub fn new(inner: Arc<dyn Checker>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    async fn breaker_metadata(&self) -> CheckMetadata {
        let record = self.breaker.record().await;
        CheckMetadata::CircuitBreaker {
            state: record.state.as_str().to_string(),
            consecutive_failures: record.consecutive_failures,
            total_rejections: record.total_rejections,
        }
    }
}

#[async_trait]
impl Checker for CircuitBreakerChecker {
    async fn check(&self) -> Result<CheckResult, CheckError> {
        let inner = &self.inner;
        let outcome = self
            .breaker
            .execute(|| async move {
                match inner.check().await {
                    Ok(result) if result.status == HealthStatus::Unhealthy => {
                        Err(ProbeFailure::Unhealthy(result))
                    }
                    Ok(result) => Ok(result),
                    Err(error) => Err(ProbeFailure::Error(error)),
                }
            })
            .await;

        let failed = match outcome {
            Ok(result) => return Ok(result),
            Err(CircuitBreakerError::OperationFailed(ProbeFailure::Unhealthy(result))) => result,
            Err(CircuitBreakerError::OperationFailed(ProbeFailure::Error(error))) => {
                CheckResult::unhealthy(self.breaker.name(), error.to_string())
            }
            Err(CircuitBreakerError::CircuitOpen { component, state }) => CheckResult::unhealthy(
                component.as_str(),
                format!("circuit breaker is {state} for {component}"),
            ),
        };

        Ok(failed.with_metadata(self.breaker_metadata().await))
    }
}
