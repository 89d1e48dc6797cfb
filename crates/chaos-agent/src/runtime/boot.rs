//! Boot — logging init, config load, Docker connection, engine creation.

use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::chaos::engine::ChaosEngine;
use crate::chaos::exec::ExecStrategy;
use crate::conf::AgentConfig;
use crate::docker::client::DockerClient;

/// Initialise the tracing / logging subsystem.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chaos_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Engine over an already connected client, honouring `tc_image`.
pub fn build_engine(docker: DockerClient, config: &AgentConfig) -> ChaosEngine {
    let exec = ExecStrategy::from_image(Some(config.tc_image.as_str()));
    match &exec {
        ExecStrategy::Helper { image } => info!("Running tc from helper image: {}", image),
        ExecStrategy::InNamespace => info!("Running tc inside target containers"),
    }
    ChaosEngine::new(Arc::new(docker), exec)
}

/// Load and validate config, connect to Docker, build the engine.
///
/// Returns `(ChaosEngine, AgentConfig)` on success.
pub async fn boot() -> Result<(ChaosEngine, AgentConfig), Box<dyn std::error::Error>> {
    info!("Starting chaos agent v{}", env!("CARGO_PKG_VERSION"));

    let config = AgentConfig::load()?;
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;
    info!(
        "Loaded configuration: action={}, dry_run={}, selectors={}",
        config.action.name(),
        config.dry_run,
        config.containers.len()
    );

    info!(
        "Connecting to Docker daemon at: {}",
        if config.docker_socket.is_empty() {
            "default socket"
        } else {
            &config.docker_socket
        }
    );

    let docker_client = DockerClient::new(&config.docker_socket).map_err(|e| {
        error!("Failed to connect to Docker: {}", e);
        e
    })?;
    docker_client.ping().await.map_err(|e| {
        error!("Docker daemon not reachable: {}", e);
        e
    })?;

    info!("Successfully connected to Docker daemon");

    let engine = build_engine(docker_client, &config);
    Ok((engine, config))
}
