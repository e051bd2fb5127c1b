//! Command handlers.
//!
//! This module contains handlers for the serve, generate, fanout and
//! maintenance commands, plus the wiring they share.

pub mod fanout;
pub mod generate;
pub mod maintenance;
pub mod serve;

use crate::backends::{BackendKind, BackendSet};
use crate::config::AppConfig;
use crate::orchestrator::LoadOrchestrator;
use crate::server::{FJALL_LOAD_PATH, MEMORY_LOAD_PATH, REDIS_LOAD_PATH};
use anyhow::Context;
use loadtest_distributed::{
    FanoutCoordinator, HttpPeerClient, KubernetesRegistry, ServiceRegistry, StaticRegistry,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Orchestrator over every opened backend.
pub fn build_orchestrator(config: &AppConfig, backends: &BackendSet) -> LoadOrchestrator {
    backends.targets().iter().fold(
        LoadOrchestrator::new(config.traces.failure_policy).with_seed(config.traces.seed),
        |orchestrator, (name, target)| orchestrator.with_target(name.clone(), target.clone()),
    )
}

/// Coordinator using the static peer list when one is configured, Kubernetes
/// discovery otherwise.
///
/// Outside a cluster the registry is empty and every fan-out lands on the
/// local target.
pub fn build_coordinator(config: &AppConfig) -> anyhow::Result<FanoutCoordinator> {
    let fanout_config = config.fanout_config()?;
    let static_peers = config.static_peers()?;

    let registry: Arc<dyn ServiceRegistry> = if !static_peers.is_empty() {
        info!(peers = static_peers.len(), "Using static replica list");
        Arc::new(StaticRegistry::new(static_peers))
    } else {
        match KubernetesRegistry::from_in_cluster() {
            Ok(registry) => Arc::new(registry),
            Err(e) => {
                warn!("Kubernetes discovery unavailable, fan-out targets localhost: {e}");
                Arc::new(StaticRegistry::new(Vec::new()))
            }
        }
    };

    let client = HttpPeerClient::new(fanout_config.timeout)
        .context("Failed to build HTTP client for fan-out")?;
    Ok(FanoutCoordinator::new(registry, Arc::new(client), fanout_config))
}

/// Trigger route replicas expose for `backend`.
pub fn load_path(backend: BackendKind) -> &'static str {
    match backend {
        BackendKind::Fjall => FJALL_LOAD_PATH,
        BackendKind::Redis => REDIS_LOAD_PATH,
        BackendKind::Memory => MEMORY_LOAD_PATH,
    }
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM.
pub fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = ctrl_c() => info!("Received interrupt signal (Ctrl+C)"),
            _ = terminate() => info!("Received SIGTERM"),
            _ = shutdown.cancelled() => return,
        }
        shutdown.cancel();
    });
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            warn!("Failed to listen for SIGTERM: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
