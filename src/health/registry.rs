//! # Health Registry
//!
//! Named map of checkers. A check run fans every checker out onto its own
//! task under one shared deadline, fans the results back in and caches the
//! aggregate report for a TTL window.

use crate::config::RegistryConfig;
use crate::constants::system;
use crate::health::checker::{run_protected, Checker};
use crate::health::result::AggregateReport;
use crate::metrics::{MetricsSink, NoopMetricsSink};
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

struct CachedReport {
    report: AggregateReport,
    stored_at: Instant,
}

struct RegistryState {
    checkers: BTreeMap<String, Arc<dyn Checker>>,
    cache: Option<CachedReport>,
    cache_ttl: Duration,
    /// Bumped whenever the checker set or cache settings change; a run only
    /// caches its report if the generation it started under is still current
    generation: u64,
}

impl RegistryState {
    fn invalidate(&mut self) {
        self.cache = None;
        self.generation = self.generation.wrapping_add(1);
    }

    fn fresh_report(&self) -> Option<&AggregateReport> {
        if self.cache_ttl.is_zero() {
            return None;
        }
        self.cache
            .as_ref()
            .filter(|cached| cached.stored_at.elapsed() < self.cache_ttl)
            .map(|cached| &cached.report)
    }
}

/// Registry of named health checkers with a cached aggregate report
pub struct HealthRegistry {
    /// Checkers and cache share one lock; it is never held across an await
    state: RwLock<RegistryState>,
    version: String,
    hard_timeout: Duration,
    metrics: Arc<dyn MetricsSink>,
}

impl HealthRegistry {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                checkers: BTreeMap::new(),
                cache: None,
                cache_ttl: system::DEFAULT_CACHE_TTL,
                generation: 0,
            }),
            version: version.into(),
            hard_timeout: system::DEFAULT_CHECK_TIMEOUT,
            metrics: Arc::new(NoopMetricsSink),
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.version.clone())
            .with_timeout(config.check_timeout())
            .with_cache_ttl(config.cache_ttl())
    }

    /// Upper bound on a check run, applied even to more generous budgets.
    /// Zero keeps the default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.hard_timeout = timeout;
        }
        self
    }

    pub fn with_cache_ttl(self, ttl: Duration) -> Self {
        self.state.write().cache_ttl = ttl;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn hard_timeout(&self) -> Duration {
        self.hard_timeout
    }

    /// Register a checker; an existing entry under the same name is replaced
    pub fn register(&self, name: impl Into<String>, checker: Arc<dyn Checker>) {
        let name = name.into();
        let mut state = self.state.write();
        let replaced = state.checkers.insert(name.clone(), checker).is_some();
        state.invalidate();

        info!(check = %name, replaced, total_checks = state.checkers.len(), "Registered health check");
    }

    pub fn unregister(&self, name: &str) -> bool {
        let mut state = self.state.write();
        let removed = state.checkers.remove(name).is_some();
        if removed {
            state.invalidate();
            info!(check = %name, remaining = state.checkers.len(), "Unregistered health check");
        }
        removed
    }

    pub fn names(&self) -> Vec<String> {
        self.state.read().checkers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().checkers.is_empty()
    }

    /// Set the cache TTL; zero disables caching
    pub fn set_cache_ttl(&self, ttl: Duration) {
        let mut state = self.state.write();
        state.cache_ttl = ttl;
        state.invalidate();
        debug!(cache_ttl_ms = ttl.as_millis(), "Updated health report cache TTL");
    }

    pub fn cache_ttl(&self) -> Duration {
        self.state.read().cache_ttl
    }

    pub fn invalidate_cache(&self) {
        self.state.write().invalidate();
    }

    /// Run every checker under the registry's hard timeout
    pub async fn check(&self) -> AggregateReport {
        self.check_within(self.hard_timeout).await
    }

    /// Run every checker under `min(budget, hard timeout)`.
    ///
    /// A cached report younger than the TTL is returned as-is without
    /// invoking any checker.
    pub async fn check_within(&self, budget: Duration) -> AggregateReport {
        let (checkers, generation): (Vec<(String, Arc<dyn Checker>)>, u64) = {
            let state = self.state.read();
            if let Some(report) = state.fresh_report() {
                debug!(timestamp = %report.timestamp, "Serving cached health report");
                return report.clone();
            }
            let checkers = state
                .checkers
                .iter()
                .map(|(name, checker)| (name.clone(), Arc::clone(checker)))
                .collect();
            (checkers, state.generation)
        };

        let started = Instant::now();
        let deadline = started + budget.min(self.hard_timeout);

        let outcomes = join_all(
            checkers
                .iter()
                .map(|(name, checker)| run_protected(name, Arc::clone(checker), deadline)),
        )
        .await;

        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let result = outcome.result;
            self.metrics
                .record_check(&result.name, result.status, result.duration);
            if let Some(error_type) = outcome.error_type {
                self.metrics.record_check_error(&result.name, error_type);
            }
            results.push(result);
        }

        let report = AggregateReport::from_checks(self.version.clone(), results, started.elapsed());

        if !report.status.is_healthy() {
            warn!(
                status = %report.status,
                failing = report.failing_checks().count(),
                duration_ms = report.duration.as_millis(),
                "Health check run completed with failures"
            );
        } else {
            debug!(
                checks = report.checks.len(),
                duration_ms = report.duration.as_millis(),
                "Health check run completed"
            );
        }

        let mut state = self.state.write();
        if state.generation != generation {
            debug!("Registry changed during check run; not caching report");
        } else if !state.cache_ttl.is_zero() {
            state.cache = Some(CachedReport {
                report: report.clone(),
                stored_at: Instant::now(),
            });
        }

        report
    }
}

impl fmt::Debug for HealthRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("HealthRegistry")
            .field("version", &self.version)
            .field("checks", &state.checkers.keys().collect::<Vec<_>>())
            .field("cache_ttl", &state.cache_ttl)
            .field("hard_timeout", &self.hard_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HealthStatus;
    use crate::error::CheckError;
    use crate::health::checker::{FnChecker, StaticChecker};
    use crate::health::result::CheckResult;

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        let registry = HealthRegistry::new("1.0.0");
        let report = registry.check().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.checks.is_empty());
        assert_eq!(report.version, "1.0.0");
    }

    #[tokio::test]
    async fn test_register_overwrites_existing_entry() {
        let registry = HealthRegistry::new("1.0.0").with_cache_ttl(Duration::ZERO);
        registry.register("api", Arc::new(StaticChecker::new(HealthStatus::Unhealthy, "down")));
        registry.register("api", Arc::new(StaticChecker::healthy()));

        let report = registry.check().await;
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_siblings() {
        let registry = HealthRegistry::new("1.0.0").with_cache_ttl(Duration::ZERO);
        registry.register("ok", Arc::new(StaticChecker::healthy()));
        registry.register(
            "broken",
            Arc::new(FnChecker::new(|| async {
                Err::<CheckResult, _>(CheckError::failed("boom"))
            })),
        );
        registry.register(
            "panics",
            Arc::new(FnChecker::new(|| async {
                if true {
                    panic!("bad probe");
                }
                Ok(CheckResult::healthy("", "never"))
            })),
        );

        let report = registry.check().await;
        assert_eq!(report.checks.len(), 3);
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.check("ok").map(|c| c.status), Some(HealthStatus::Healthy));
        assert_eq!(report.check("broken").map(|c| c.status), Some(HealthStatus::Unhealthy));
        assert_eq!(report.check("panics").map(|c| c.status), Some(HealthStatus::Unhealthy));
    }

    #[tokio::test]
    async fn test_budget_smaller_than_hard_timeout_wins() {
        let registry = HealthRegistry::new("1.0.0").with_cache_ttl(Duration::ZERO);
        registry.register(
            "slow",
            Arc::new(StaticChecker::healthy().with_delay(Duration::from_secs(30))),
        );

        let started = std::time::Instant::now();
        let report = registry.check_within(Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_hard_timeout_caps_generous_budget() {
        let registry = HealthRegistry::new("1.0.0")
            .with_timeout(Duration::from_millis(50))
            .with_cache_ttl(Duration::ZERO);
        registry.register(
            "slow",
            Arc::new(StaticChecker::healthy().with_delay(Duration::from_secs(30))),
        );

        let started = std::time::Instant::now();
        let report = registry.check_within(Duration::from_secs(60)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(report.checks[0].message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_cache_serves_identical_report_within_ttl() {
        let registry = HealthRegistry::new("1.0.0").with_cache_ttl(Duration::from_millis(100));
        let checker = Arc::new(StaticChecker::healthy());
        registry.register("api", checker.clone());

        let first = registry.check().await;
        let second = registry.check().await;
        assert_eq!(first.timestamp, second.timestamp);
        assert_eq!(checker.invocations(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        let third = registry.check().await;
        assert_ne!(first.timestamp, third.timestamp);
        assert_eq!(checker.invocations(), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let registry = HealthRegistry::new("1.0.0");
        registry.set_cache_ttl(Duration::ZERO);
        let checker = Arc::new(StaticChecker::healthy());
        registry.register("api", checker.clone());

        registry.check().await;
        registry.check().await;
        assert_eq!(checker.invocations(), 2);
    }

    #[tokio::test]
    async fn test_register_invalidates_cache() {
        let registry = HealthRegistry::new("1.0.0");
        registry.register("api", Arc::new(StaticChecker::healthy()));
        let first = registry.check().await;
        assert_eq!(first.checks.len(), 1);

        registry.register("cache", Arc::new(StaticChecker::new(HealthStatus::Degraded, "slow")));
        let second = registry.check().await;
        assert_eq!(second.checks.len(), 2);
        assert_eq!(second.status, HealthStatus::Degraded);

        assert!(registry.unregister("cache"));
        assert!(!registry.unregister("cache"));
        assert_eq!(registry.names(), vec!["api".to_string()]);
    }

    #[tokio::test]
    async fn test_registration_during_run_is_not_hidden_by_cache() {
        let registry = Arc::new(HealthRegistry::new("1.0.0").with_cache_ttl(Duration::from_secs(10)));
        registry.register(
            "slow",
            Arc::new(StaticChecker::healthy().with_delay(Duration::from_millis(200))),
        );

        let in_flight = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.check().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        registry.register("db", Arc::new(StaticChecker::new(HealthStatus::Unhealthy, "refused")));

        let stale = in_flight.await.unwrap();
        assert_eq!(stale.checks.len(), 1);

        let report = registry.check().await;
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.status, HealthStatus::Unhealthy);

        // Nothing changed during this run, so it is cached again
        let cached = registry.check().await;
        assert_eq!(cached.timestamp, report.timestamp);
    }

    #[tokio::test]
    async fn test_unregister_during_run_is_not_hidden_by_cache() {
        let registry = Arc::new(HealthRegistry::new("1.0.0").with_cache_ttl(Duration::from_secs(10)));
        registry.register("api", Arc::new(StaticChecker::healthy()));
        registry.register(
            "legacy",
            Arc::new(StaticChecker::new(HealthStatus::Unhealthy, "gone").with_delay(Duration::from_millis(200))),
        );

        let in_flight = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.check().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(registry.unregister("legacy"));
        in_flight.await.unwrap();

        let report = registry.check().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.checks.len(), 1);
    }
}
