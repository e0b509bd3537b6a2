use std::time::Duration;

/// Crate-level errors.
///
/// Checker failures never surface here; they are folded into unhealthy
/// results at the registry boundary. What remains are configuration-time
/// problems and lookups of names that were never registered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HealthError {
    #[error("Dependency cycle detected among {node_count} nodes")]
    CycleDetected { node_count: usize },

    #[error("Dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

pub type Result<T> = std::result::Result<T, HealthError>;

/// Why a single checker invocation did not produce a result of its own
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("check failed: {0}")]
    Failed(String),

    #[error("check timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("check panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CheckError {
    pub fn failed(message: impl Into<String>) -> Self {
        CheckError::Failed(message.into())
    }

    /// Label used for the `error_type` metric dimension
    pub fn error_type(&self) -> &'static str {
        match self {
            CheckError::Failed(_) => "failed",
            CheckError::Timeout(_) => "timeout",
            CheckError::Panicked(_) => "panic",
            CheckError::Other(_) => "other",
        }
    }
}
