//! Generate command handler.

use super::build_orchestrator;
use crate::backends::{BackendKind, BackendSet};
use crate::config::AppConfig;
use crate::orchestrator::GenerateReport;
use anyhow::Context;
use tokio_util::sync::CancellationToken;

/// Run one generate locally, drain and close the pipeline, and return the
/// report.
pub async fn run_generate(
    config: &AppConfig,
    backend: BackendKind,
    trace_count: u64,
) -> anyhow::Result<GenerateReport> {
    let shutdown = CancellationToken::new();
    let backends = BackendSet::open(config, &[backend], shutdown.clone()).await?;
    let orchestrator = build_orchestrator(config, &backends);

    let result = orchestrator
        .generate(backend.as_str(), trace_count, config.traces.spans_per_trace)
        .await;

    // Drivers force a final flush and close their pipelines on cancellation.
    shutdown.cancel();
    backends.shutdown().await;

    result.with_context(|| format!("Generate run on {backend} failed"))
}

/// Print `report` as pretty JSON on stdout.
pub fn print_report(report: &GenerateReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to encode report")?;
    println!("{json}");
    Ok(())
}
