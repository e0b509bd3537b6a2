//! # Checker Capability
//!
//! A `Checker` is one unit of health work. Implementations only report what
//! they observe; the registry owns timeouts, panic isolation and naming via
//! [`run_protected`].

use crate::constants::HealthStatus;
use crate::error::CheckError;
use crate::health::result::{CheckMetadata, CheckResult};
use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A polymorphic health probe.
///
/// The `name` of the returned result is overwritten with the name the
/// checker was registered under, and a zero `duration` is replaced with the
/// measured wall time.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self) -> Result<CheckResult, CheckError>;
}

/// What [`run_protected`] observed for one checker
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub result: CheckResult,
    /// Set when the checker errored, panicked or ran past the deadline
    pub error_type: Option<&'static str>,
}

impl CheckOutcome {
    fn from_error(name: &str, error: CheckError, elapsed: Duration) -> Self {
        let error_type = error.error_type();
        Self {
            result: CheckResult::unhealthy(name, error.to_string()).with_duration(elapsed),
            error_type: Some(error_type),
        }
    }
}

/// Run a checker on its own task so that errors, panics and deadline
/// expiry all become unhealthy results instead of propagating.
///
/// A checker still running at the deadline is aborted.
pub async fn run_protected(name: &str, checker: Arc<dyn Checker>, deadline: Instant) -> CheckOutcome {
    let started = Instant::now();
    let mut handle = tokio::spawn(async move { checker.check().await });

    let joined = tokio::time::timeout_at(deadline, &mut handle).await;
    let elapsed = started.elapsed();

    match joined {
        Ok(Ok(Ok(mut result))) => {
            result.name = name.to_string();
            if result.duration.is_zero() {
                result.duration = elapsed;
            }
            CheckOutcome {
                result,
                error_type: None,
            }
        }
        Ok(Ok(Err(error))) => {
            debug!(check = %name, error = %error, "Checker returned an error");
            CheckOutcome::from_error(name, error, elapsed)
        }
        Ok(Err(join_error)) => {
            let error = if join_error.is_panic() {
                CheckError::Panicked(panic_message(join_error.into_panic()))
            } else {
                CheckError::failed("check task was cancelled")
            };
            warn!(check = %name, error = %error, "Checker task did not complete");
            CheckOutcome::from_error(name, error, elapsed)
        }
        Err(_) => {
            handle.abort();
            warn!(
                check = %name,
                elapsed_ms = elapsed.as_millis(),
                "Checker exceeded deadline"
            );
            CheckOutcome::from_error(name, CheckError::Timeout(elapsed), elapsed)
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

type CheckFuture = Pin<Box<dyn Future<Output = Result<CheckResult, CheckError>> + Send>>;

/// Checker backed by an async closure
pub struct FnChecker {
    func: Box<dyn Fn() -> CheckFuture + Send + Sync>,
}

impl FnChecker {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CheckResult, CheckError>> + Send + 'static,
    {
        Self {
            func: Box::new(move || Box::pin(func())),
        }
    }
}

impl fmt::Debug for FnChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnChecker").finish_non_exhaustive()
    }
}

#[async_trait]
impl Checker for FnChecker {
    async fn check(&self) -> Result<CheckResult, CheckError> {
        (self.func)().await
    }
}

/// Checker that always reports the same status, optionally after a delay
#[derive(Debug)]
pub struct StaticChecker {
    status: HealthStatus,
    message: String,
    delay: Duration,
    invocations: AtomicU64,
}

impl StaticChecker {
    pub fn new(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            delay: Duration::ZERO,
            invocations: AtomicU64::new(0),
        }
    }

    pub fn healthy() -> Self {
        Self::new(HealthStatus::Healthy, "ok")
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// How many times `check` has been called
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Checker for StaticChecker {
    async fn check(&self) -> Result<CheckResult, CheckError> {
        self.invocations.fetch_add(1, Ordering::AcqRel);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(CheckResult::new("", self.status, self.message.clone()))
    }
}

/// Checker that opens a TCP connection to `address`.
///
/// Connecting slower than the degraded threshold reports degraded.
#[derive(Debug, Clone)]
pub struct TcpChecker {
    address: String,
    timeout: Duration,
    degraded_after: Option<Duration>,
}

impl TcpChecker {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
            degraded_after: None,
        }
    }

    pub fn degraded_after(mut self, threshold: Duration) -> Self {
        self.degraded_after = Some(threshold);
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Checker for TcpChecker {
    async fn check(&self) -> Result<CheckResult, CheckError> {
        let started = Instant::now();
        let connected = tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await;
        let elapsed = started.elapsed();

        match connected {
            Ok(Ok(_stream)) => {
                let slow = self.degraded_after.is_some_and(|limit| elapsed > limit);
                let result = if slow {
                    CheckResult::degraded(
                        "",
                        format!("connected to {} in {}ms", self.address, elapsed.as_millis()),
                    )
                } else {
                    CheckResult::healthy("", format!("connected to {}", self.address))
                };
                Ok(result
                    .with_duration(elapsed)
                    .with_metadata(CheckMetadata::Network {
                        address: self.address.clone(),
                    }))
            }
            Ok(Err(e)) => Err(CheckError::failed(format!(
                "connection to {} failed: {e}",
                self.address
            ))),
            Err(_) => Err(CheckError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deadline_in(duration: Duration) -> Instant {
        Instant::now() + duration
    }

    #[tokio::test]
    async fn test_successful_check_takes_registered_name() {
        let checker: Arc<dyn Checker> = Arc::new(StaticChecker::healthy());
        let outcome = run_protected("api", checker, deadline_in(Duration::from_secs(1))).await;

        assert_eq!(outcome.result.name, "api");
        assert_eq!(outcome.result.status, HealthStatus::Healthy);
        assert!(outcome.error_type.is_none());
    }

    #[tokio::test]
    async fn test_error_becomes_unhealthy_result() {
        let checker: Arc<dyn Checker> =
            Arc::new(FnChecker::new(|| async {
            Err::<CheckResult, _>(CheckError::failed("connection refused"))
        }));
        let outcome = run_protected("db", checker, deadline_in(Duration::from_secs(1))).await;

        assert_eq!(outcome.result.status, HealthStatus::Unhealthy);
        assert_eq!(outcome.result.message, "check failed: connection refused");
        assert_eq!(outcome.error_type, Some("failed"));
    }

    #[tokio::test]
    async fn test_panic_is_recovered() {
        let checker: Arc<dyn Checker> = Arc::new(FnChecker::new(|| async {
            if true {
                panic!("probe exploded");
            }
            Ok(CheckResult::healthy("", "unreachable"))
        }));
        let outcome = run_protected("flaky", checker, deadline_in(Duration::from_secs(1))).await;

        assert_eq!(outcome.result.status, HealthStatus::Unhealthy);
        assert!(outcome.result.message.contains("probe exploded"));
        assert_eq!(outcome.error_type, Some("panic"));
    }

    #[tokio::test]
    async fn test_deadline_expiry_is_reported() {
        let checker: Arc<dyn Checker> =
            Arc::new(StaticChecker::healthy().with_delay(Duration::from_secs(5)));
        let outcome = run_protected("slow", checker, deadline_in(Duration::from_millis(50))).await;

        assert_eq!(outcome.result.status, HealthStatus::Unhealthy);
        assert!(outcome.result.message.contains("timed out"));
        assert_eq!(outcome.error_type, Some("timeout"));
        assert!(outcome.result.duration < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_tcp_checker_against_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let checker = TcpChecker::new(address.clone(), Duration::from_secs(1));
        let result = checker.check().await.unwrap();
        assert_eq!(result.status, HealthStatus::Healthy);
        assert_eq!(result.metadata, CheckMetadata::Network { address });
    }

    #[tokio::test]
    async fn test_tcp_checker_refused_connection() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let checker = TcpChecker::new(address, Duration::from_secs(1));
        assert!(checker.check().await.is_err());
    }
}
