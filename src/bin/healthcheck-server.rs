//! # Health Check Server
//!
//! Loads configuration, registers the configured TCP probes and serves the
//! health endpoints until Ctrl-C.

use anyhow::Context;
use clap::Parser;
use healthcheck_core::config::{ConfigManager, HealthCheckConfig};
use healthcheck_core::dependencies::DependencyDescriptor;
use healthcheck_core::health::{Checker, TcpChecker};
use healthcheck_core::logging::{init_structured_logging, log_error};
use healthcheck_core::orchestrator::HealthOrchestrator;
use healthcheck_core::web::{create_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "healthcheck-server")]
#[command(about = "Serve health, readiness and metrics endpoints")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file; defaults to config/healthcheck.toml when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment overlay to apply (defaults to HEALTHCHECK_ENV / APP_ENV)
    #[arg(short, long)]
    environment: Option<String>,

    /// Override server.bind_address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();
    let cli = Cli::parse();

    let environment = cli
        .environment
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_file(path, &environment),
        None => ConfigManager::load_from_directory("config", &environment),
    }
    .context("failed to load configuration")?;

    let mut config = manager.config().clone();
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    let orchestrator = Arc::new(
        HealthOrchestrator::from_config(&config).context("failed to build health orchestrator")?,
    );
    register_checks(&orchestrator, &config);

    if let Err(e) = orchestrator.validate_dependencies() {
        warn!(error = %e, "Dependency graph is invalid; dependency checks will be skipped");
    }

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, environment = %environment, "🚀 Health check server listening");

    let app = create_router(AppState::new(orchestrator));
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        log_error("healthcheck-server", "serve", &e.to_string(), None);
        return Err(e.into());
    }

    info!("Health check server stopped");
    Ok(())
}

fn register_checks(orchestrator: &HealthOrchestrator, config: &HealthCheckConfig) {
    let breaker_config = config.circuit_breaker.to_breaker_config();

    for check in &config.checks {
        let mut probe = TcpChecker::new(check.address.clone(), check.timeout());
        if let Some(ms) = check.degraded_after_ms {
            probe = probe.degraded_after(Duration::from_millis(ms));
        }
        let probe: Arc<dyn Checker> = Arc::new(probe);

        if check.circuit_breaker {
            orchestrator.register_with_circuit_breaker(&check.name, Arc::clone(&probe), breaker_config.clone());
        } else {
            orchestrator.register(check.name.clone(), Arc::clone(&probe));
        }

        if let Some(kind) = check.dependency {
            orchestrator.register_dependency(
                DependencyDescriptor::new(check.name.clone(), kind, probe)
                    .critical(check.critical)
                    .depends_on(check.depends_on.iter().cloned()),
            );
        }
    }

    info!(checks = config.checks.len(), "Registered configured checks");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log_error("healthcheck-server", "shutdown_signal", &e.to_string(), Some("serving until killed"));
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
