//! Shared helpers for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use healthcheck_core::constants::HealthStatus;
use healthcheck_core::error::CheckError;
use healthcheck_core::health::{CheckResult, Checker, StaticChecker};
use healthcheck_core::orchestrator::HealthOrchestrator;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Orchestrator with the report cache disabled so every check runs probes
pub fn uncached_orchestrator(version: &str) -> HealthOrchestrator {
    let orchestrator = HealthOrchestrator::new(version);
    orchestrator.set_cache_ttl(Duration::ZERO);
    orchestrator
}

pub fn fixed(status: HealthStatus, message: &str) -> Arc<dyn Checker> {
    Arc::new(StaticChecker::new(status, message))
}

/// Checker whose health can be flipped from the test body
#[derive(Debug)]
pub struct ToggleChecker {
    healthy: AtomicBool,
    invocations: AtomicU64,
}

impl ToggleChecker {
    pub fn new(healthy: bool) -> Arc<Self> {
        Arc::new(Self {
            healthy: AtomicBool::new(healthy),
            invocations: AtomicU64::new(0),
        })
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Checker for ToggleChecker {
    async fn check(&self) -> Result<CheckResult, CheckError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            Ok(CheckResult::healthy("", "reachable"))
        } else {
            Ok(CheckResult::unhealthy("", "connection refused"))
        }
    }
}
