//! SLURM sidecar - pod submission bridge
//!
//! This binary runs next to a virtual-kubelet provider, accepting pod
//! specifications over HTTP and submitting them to SLURM as batch jobs.

use anyhow::Result;
use bridge_lib::{
    health::{components, HealthRegistry},
    BridgeConfig, BridgeMetrics, JobTable, SlurmBackend, Submitter,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting slurm-sidecar");

    // Load configuration
    let config = BridgeConfig::load()?;
    info!(
        runtime = %config.container_runtime,
        data_root = %config.data_root,
        "Sidecar configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::SCHEDULER).await;
    health_registry.register(components::WORKSPACE).await;

    // The data root must exist before any submission creates a working
    // directory under it
    if let Err(e) = tokio::fs::create_dir_all(&config.data_root).await {
        health_registry
            .set_unhealthy(components::WORKSPACE, e.to_string())
            .await;
    }

    // Initialize metrics
    let _metrics = BridgeMetrics::new();

    // Wire the submission pipeline
    let port = config.sidecar_port;
    let jobs = JobTable::new();
    let backend = Arc::new(SlurmBackend::new());

    // An unreachable submit binary surfaces through /healthz
    if let Err(e) = backend.probe_scheduler(&config).await {
        health_registry
            .set_unhealthy(components::SCHEDULER, e.to_string())
            .await;
    }

    let submitter = Submitter::new(config, backend, jobs);

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(submitter, health_registry.clone()));

    // Mark sidecar as ready after initialization
    health_registry.set_ready(true).await;

    // Start the API server
    let api_handle = tokio::spawn(api::serve(port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    api_handle.abort();

    Ok(())
}
