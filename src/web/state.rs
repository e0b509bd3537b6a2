//! Shared state for the web handlers.

use crate::orchestrator::HealthOrchestrator;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    orchestrator: Arc<HealthOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<HealthOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &HealthOrchestrator {
        &self.orchestrator
    }
}
