//! Read-side and maintenance seams exposed next to a pipeline.

use crate::error::PipelineError;

/// Reads against the persisted entries of one backend.
///
/// Expired entries are invisible to every method.
#[async_trait::async_trait]
pub trait EntryReader: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PipelineError>;

    /// Any one live entry.
    async fn first_entry(&self) -> Result<Option<(String, Vec<u8>)>, PipelineError>;

    /// Number of live entries. Scans every key.
    async fn count(&self) -> Result<u64, PipelineError>;
}

/// Result of one garbage collection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Expired keys removed by the sweep.
    pub expired_removed: u64,
    /// Bytes reclaimed from the value log. Zero is a benign outcome.
    pub bytes_reclaimed: u64,
}

/// Result of a compaction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
    pub passes: usize,
    pub disk_space_before: u64,
    pub disk_space_after: u64,
}

/// Structural maintenance offered by the embedded engine.
#[async_trait::async_trait]
pub trait Maintenance: Send + Sync {
    async fn run_garbage_collection(&self) -> Result<GcReport, PipelineError>;

    /// Run up to `levels` compaction passes. `levels` must be positive.
    async fn compact(&self, levels: usize) -> Result<CompactionReport, PipelineError>;
}
