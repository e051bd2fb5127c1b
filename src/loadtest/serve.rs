//! Serve command handler.

use super::{build_coordinator, build_orchestrator, spawn_signal_handler};
use crate::backends::{BackendKind, BackendSet};
use crate::config::AppConfig;
use crate::jobs::JobTracker;
use crate::server::{self, AppState};
use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Run the trigger surface until Ctrl+C or SIGTERM, then drain every
/// pipeline.
pub async fn run_serve(config: AppConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let kinds = BackendKind::enabled(&config);
    tracing::info!(backends = ?kinds, "Starting kv-loadtest server");

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let backends = BackendSet::open(&config, &kinds, shutdown.clone()).await?;
    let state = AppState {
        orchestrator: Arc::new(build_orchestrator(&config, &backends)),
        jobs: Arc::new(JobTracker::default()),
        fanout: Arc::new(build_coordinator(&config)?),
        metrics: backends.prometheus(),
        spans_per_trace: config.traces.spans_per_trace,
        compaction_levels: config.fjall.compaction_levels,
    };

    spawn_signal_handler(shutdown.clone());
    let result = server::serve(listener, state, shutdown.clone()).await;

    // Drivers drain and close their pipelines once cancelled.
    shutdown.cancel();
    backends.shutdown().await;
    result
}
