//! Maintenance command handlers for the embedded keyspace.

use crate::config::AppConfig;
use anyhow::Context;
use loadtest_pipeline::{CompactionReport, EntryReader, GcReport, Maintenance};
use loadtest_pipeline_fjall::FjallHandle;

fn open(config: &AppConfig) -> anyhow::Result<FjallHandle> {
    let fjall_config = config.fjall_config();
    FjallHandle::open(&fjall_config)
        .with_context(|| format!("Failed to open fjall keyspace at {:?}", fjall_config.path))
}

/// Compact the keyspace at the configured path.
pub async fn run_compact(
    config: &AppConfig,
    levels: Option<usize>,
) -> anyhow::Result<CompactionReport> {
    let handle = open(config)?;
    let levels = levels.unwrap_or(config.fjall.compaction_levels);
    let report = handle.compact(levels).await?;
    handle.sync_all().await?;
    Ok(report)
}

/// Sweep expired entries and reclaim value-log space.
pub async fn run_gc(config: &AppConfig) -> anyhow::Result<GcReport> {
    let handle = open(config)?;
    let report = handle.run_garbage_collection().await?;
    handle.sync_all().await?;
    Ok(report)
}

/// Count live entries.
pub async fn run_count(config: &AppConfig) -> anyhow::Result<u64> {
    let handle = open(config)?;
    Ok(handle.count().await?)
}
