//! # Dependency Manager
//!
//! Registered dependency descriptors plus the graph that orders them. Both
//! live under a single lock so a registration is never half-visible to a
//! concurrent `check_all`.

use crate::config::DependenciesConfig;
use crate::constants::{system, DependencyKind, HealthStatus};
use crate::dependencies::graph::DependencyGraph;
use crate::error::{HealthError, Result};
use crate::health::{run_protected, CheckResult, Checker};
use crate::metrics::{MetricsSink, NoopMetricsSink};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A registered dependency and how to probe it
#[derive(Clone)]
pub struct DependencyDescriptor {
    pub name: String,
    pub kind: DependencyKind,
    /// Unhealthy critical dependencies degrade their dependents and fail
    /// the composite report
    pub critical: bool,
    /// Names this dependency depends on
    pub dependencies: Vec<String>,
    pub checker: Arc<dyn Checker>,
}

impl DependencyDescriptor {
    pub fn new(name: impl Into<String>, kind: DependencyKind, checker: Arc<dyn Checker>) -> Self {
        Self {
            name: name.into(),
            kind,
            critical: false,
            dependencies: Vec::new(),
            checker,
        }
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("critical", &self.critical)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Result of checking one dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyStatus {
    #[serde(flatten)]
    pub result: CheckResult,
    pub kind: DependencyKind,
    pub critical: bool,
    pub dependencies: Vec<String>,
}

impl DependencyStatus {
    pub fn name(&self) -> &str {
        &self.result.name
    }

    pub fn status(&self) -> HealthStatus {
        self.result.status
    }

    pub fn is_critical_failure(&self) -> bool {
        self.critical && self.result.status == HealthStatus::Unhealthy
    }
}

#[derive(Default)]
struct ManagerState {
    graph: DependencyGraph,
    descriptors: BTreeMap<String, DependencyDescriptor>,
}

impl ManagerState {
    /// Drop placeholders among `candidates` that nothing points at any more
    fn prune_placeholders(&mut self, candidates: &[String]) {
        for name in candidates {
            let orphaned =
                !self.descriptors.contains_key(name) && self.graph.dependents_of(name).is_empty();
            if orphaned {
                self.graph.remove_node(name);
            }
        }
    }
}

pub struct DependencyManager {
    state: RwLock<ManagerState>,
    /// Per-dependency deadline
    timeout: Duration,
    metrics: Arc<dyn MetricsSink>,
}

impl DependencyManager {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ManagerState::default()),
            timeout: system::DEFAULT_DEPENDENCY_TIMEOUT,
            metrics: Arc::new(NoopMetricsSink),
        }
    }

    pub fn from_config(config: &DependenciesConfig) -> Self {
        Self::new().with_timeout(config.check_timeout())
    }

    /// Zero keeps the default
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register or replace a dependency. Cycles are not rejected here; use
    /// [`DependencyManager::validate_graph`] once configuration is complete.
    pub fn register(&self, descriptor: DependencyDescriptor) {
        let mut state = self.state.write();
        let previous: Vec<String> = state
            .graph
            .node(&descriptor.name)
            .map(|node| node.dependencies.iter().cloned().collect())
            .unwrap_or_default();
        state
            .graph
            .add_node(&descriptor.name, descriptor.dependencies.iter().cloned());
        state.prune_placeholders(&previous);

        info!(
            dependency = %descriptor.name,
            kind = %descriptor.kind,
            critical = descriptor.critical,
            depends_on = ?descriptor.dependencies,
            "Registered dependency"
        );
        state.descriptors.insert(descriptor.name.clone(), descriptor);
    }

    /// Remove a dependency. A node other registrations still depend on is
    /// kept as a placeholder so their ordering survives.
    pub fn unregister(&self, name: &str) -> bool {
        let mut state = self.state.write();
        let Some(descriptor) = state.descriptors.remove(name) else {
            return false;
        };

        if state.graph.dependents_of(name).is_empty() {
            state.graph.remove_node(name);
        } else {
            state.graph.add_node(name, Vec::<String>::new());
        }

        state.prune_placeholders(&descriptor.dependencies);

        info!(dependency = %name, remaining = state.descriptors.len(), "Unregistered dependency");
        true
    }

    pub fn validate_graph(&self) -> Result<()> {
        self.state.read().graph.validate_cycles()
    }

    /// Registered dependency names in topological order
    pub fn dependency_names(&self) -> Vec<String> {
        let state = self.state.read();
        state
            .graph
            .topological_sort()
            .into_iter()
            .filter(|name| state.descriptors.contains_key(name))
            .collect()
    }

    pub fn critical_dependencies(&self) -> Vec<DependencyDescriptor> {
        self.state
            .read()
            .descriptors
            .values()
            .filter(|descriptor| descriptor.critical)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().descriptors.len()
    }

    /// Graph nodes, placeholders included
    pub fn node_count(&self) -> usize {
        self.state.read().graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().descriptors.is_empty()
    }

    /// Check every registered dependency strictly in topological order.
    ///
    /// A dependent of an unhealthy critical dependency is reported degraded
    /// whatever its own checker said. A cyclic graph yields no results.
    pub async fn check_all(&self) -> Vec<DependencyStatus> {
        let plan: Vec<DependencyDescriptor> = {
            let state = self.state.read();
            let order = state.graph.topological_sort();
            if order.is_empty() && !state.graph.is_empty() {
                warn!(
                    nodes = state.graph.len(),
                    "Dependency graph contains a cycle; skipping dependency checks"
                );
                return Vec::new();
            }
            order
                .iter()
                .filter_map(|name| state.descriptors.get(name).cloned())
                .collect()
        };

        let mut statuses: Vec<DependencyStatus> = Vec::with_capacity(plan.len());
        let mut computed: HashMap<String, (HealthStatus, bool)> = HashMap::with_capacity(plan.len());

        for descriptor in plan {
            let mut status = self.run(&descriptor).await;

            let failing_critical = descriptor.dependencies.iter().find(|dependency| {
                matches!(
                    computed.get(dependency.as_str()),
                    Some((HealthStatus::Unhealthy, true))
                )
            });
            if let Some(failing) = failing_critical {
                warn!(
                    dependency = %descriptor.name,
                    failing = %failing,
                    "Degrading dependency because a critical dependency is unhealthy"
                );
                status.result.status = HealthStatus::Degraded;
                status.result.message = format!("dependency '{failing}' is unhealthy");
            }

            computed.insert(descriptor.name.clone(), (status.result.status, descriptor.critical));
            self.metrics.record_dependency(&descriptor.name, status.result.status);
            statuses.push(status);
        }

        debug!(checked = statuses.len(), "Dependency checks completed");
        statuses
    }

    /// Check a single dependency in isolation, without propagation
    pub async fn check_dependency(&self, name: &str) -> Result<DependencyStatus> {
        let descriptor = self
            .state
            .read()
            .descriptors
            .get(name)
            .cloned()
            .ok_or_else(|| HealthError::DependencyNotFound(name.to_string()))?;

        let status = self.run(&descriptor).await;
        self.metrics.record_dependency(name, status.result.status);
        Ok(status)
    }

    async fn run(&self, descriptor: &DependencyDescriptor) -> DependencyStatus {
        let deadline = Instant::now() + self.timeout;
        let outcome = run_protected(&descriptor.name, Arc::clone(&descriptor.checker), deadline).await;

        DependencyStatus {
            result: outcome.result,
            kind: descriptor.kind,
            critical: descriptor.critical,
            dependencies: descriptor.dependencies.clone(),
        }
    }
}

impl Default for DependencyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DependencyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("DependencyManager")
            .field("dependencies", &state.descriptors.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish()
    }
}
