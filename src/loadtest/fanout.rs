//! Fanout command handler.

use super::{build_coordinator, load_path};
use crate::backends::BackendKind;
use crate::config::AppConfig;
use loadtest_distributed::{FanoutReport, WorkCount};

/// Trigger every discovered replica once and return the report.
pub async fn run_fanout(
    config: &AppConfig,
    backend: BackendKind,
    count: WorkCount,
) -> anyhow::Result<FanoutReport> {
    let coordinator = build_coordinator(config)?;
    let report = coordinator.distribute(count, load_path(backend)).await;
    tracing::info!(
        backend = %backend,
        replicas = report.replicas(),
        failed = report.failed(),
        "Fan-out finished"
    );
    Ok(report)
}
