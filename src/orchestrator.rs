//! Load orchestration over a named set of backend pipelines.
//!
//! The orchestrator generates traces with [`SpanGenerator`], writes every
//! span through the target's [`BatchPipeline`] and exposes the read and
//! maintenance operations of the targets that support them.

use loadtest_generator::{GeneratedSpan, SpanGenerator};
use loadtest_pipeline::{
    BatchPipeline, CompactionReport, EntryReader, GcReport, Maintenance, PipelineError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors surfaced by orchestrator operations.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Backend '{0}' is not enabled")]
    UnknownBackend(String),

    #[error("Backend '{backend}' does not support {operation}")]
    Unsupported {
        backend: String,
        operation: &'static str,
    },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// What a failing trace does to the rest of a run.
///
/// Either way the remaining spans of the failing trace are skipped.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Continue with the next trace.
    #[default]
    SkipGroup,
    /// Stop the whole run.
    AbortRun,
}

/// One backend as seen by the orchestrator.
#[derive(Clone)]
pub struct BackendTarget {
    pub pipeline: Arc<dyn BatchPipeline>,
    pub reader: Option<Arc<dyn EntryReader>>,
    pub maintenance: Option<Arc<dyn Maintenance>>,
}

impl BackendTarget {
    pub fn new(pipeline: Arc<dyn BatchPipeline>) -> Self {
        Self {
            pipeline,
            reader: None,
            maintenance: None,
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn EntryReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn with_maintenance(mut self, maintenance: Arc<dyn Maintenance>) -> Self {
        self.maintenance = Some(maintenance);
        self
    }
}

/// Summary of one generate run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerateReport {
    pub backend: String,
    pub groups_attempted: u64,
    pub groups_completed: u64,
    pub records_written: u64,
    /// Spans of failing traces that were not buffered.
    pub records_failed: u64,
    pub errors: Vec<String>,
    /// `true` when [`FailurePolicy::AbortRun`] stopped the run early.
    pub aborted: bool,
    pub duration_ms: u64,
    pub records_per_sec: f64,
}

pub struct LoadOrchestrator {
    targets: BTreeMap<String, BackendTarget>,
    failure_policy: FailurePolicy,
    seed: Option<u64>,
}

impl LoadOrchestrator {
    pub fn new(failure_policy: FailurePolicy) -> Self {
        Self {
            targets: BTreeMap::new(),
            failure_policy,
            seed: None,
        }
    }

    /// Use a fixed generator seed for every run.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_target(mut self, name: impl Into<String>, target: BackendTarget) -> Self {
        self.targets.insert(name.into(), target);
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn backends(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn has_backend(&self, backend: &str) -> bool {
        self.targets.contains_key(backend)
    }

    fn target(&self, backend: &str) -> Result<&BackendTarget, OrchestratorError> {
        self.targets
            .get(backend)
            .ok_or_else(|| OrchestratorError::UnknownBackend(backend.to_string()))
    }

    fn reader(&self, backend: &str) -> Result<&Arc<dyn EntryReader>, OrchestratorError> {
        self.target(backend)?
            .reader
            .as_ref()
            .ok_or_else(|| OrchestratorError::Unsupported {
                backend: backend.to_string(),
                operation: "reads",
            })
    }

    fn maintenance(&self, backend: &str) -> Result<&Arc<dyn Maintenance>, OrchestratorError> {
        self.target(backend)?
            .maintenance
            .as_ref()
            .ok_or_else(|| OrchestratorError::Unsupported {
                backend: backend.to_string(),
                operation: "maintenance",
            })
    }

    fn generator(&self) -> SpanGenerator {
        match self.seed {
            Some(seed) => SpanGenerator::new(seed),
            None => SpanGenerator::from_entropy(),
        }
    }

    /// Write `trace_count` traces of `spans_per_trace` chained spans to
    /// `backend`, then request one flush.
    ///
    /// A failing `put` skips the rest of its trace. The final flush is
    /// conditional on the pipeline's thresholds; the driver commits whatever
    /// it leaves pending.
    pub async fn generate(
        &self,
        backend: &str,
        trace_count: u64,
        spans_per_trace: u64,
    ) -> Result<GenerateReport, OrchestratorError> {
        let target = self.target(backend)?;
        let pipeline = &target.pipeline;
        let mut generator = self.generator();
        let start = Instant::now();

        info!(
            backend,
            trace_count,
            spans_per_trace,
            "Starting generate run"
        );

        let mut report = GenerateReport {
            backend: backend.to_string(),
            ..Default::default()
        };

        for _ in 0..trace_count {
            report.groups_attempted += 1;
            let mut written = 0u64;
            let mut failure = None;

            for GeneratedSpan { key, span } in generator.trace(spans_per_trace) {
                match pipeline.put(&key.group_id, &key.item_id, &span).await {
                    Ok(()) => written += 1,
                    Err(e) => {
                        error!(
                            backend,
                            group_id = %key.group_id,
                            item_id = %key.item_id,
                            "Put failed, skipping rest of trace: {e}"
                        );
                        failure = Some(e);
                        break;
                    }
                }
            }

            report.records_written += written;
            match failure {
                None => report.groups_completed += 1,
                Some(e) => {
                    report.records_failed += spans_per_trace - written;
                    report.errors.push(e.to_string());
                    if self.failure_policy == FailurePolicy::AbortRun {
                        warn!(backend, "Aborting generate run after failed trace");
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        pipeline.flush().await;

        let elapsed = start.elapsed();
        report.duration_ms = elapsed.as_millis() as u64;
        report.records_per_sec = if elapsed.as_secs_f64() > 0.0 {
            report.records_written as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        info!(
            backend,
            groups = report.groups_completed,
            records = report.records_written,
            failed = report.records_failed,
            duration_ms = report.duration_ms,
            records_per_sec = %format!("{:.2}", report.records_per_sec),
            "Generate run finished"
        );
        Ok(report)
    }

    pub async fn get_by_key(
        &self,
        backend: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, OrchestratorError> {
        Ok(self.reader(backend)?.get(key).await?)
    }

    pub async fn get_any_entry(
        &self,
        backend: &str,
    ) -> Result<Option<(String, Vec<u8>)>, OrchestratorError> {
        Ok(self.reader(backend)?.first_entry().await?)
    }

    /// Count live entries. Scans every key.
    pub async fn count_entries(&self, backend: &str) -> Result<u64, OrchestratorError> {
        Ok(self.reader(backend)?.count().await?)
    }

    pub async fn trigger_compaction(
        &self,
        backend: &str,
        levels: usize,
    ) -> Result<CompactionReport, OrchestratorError> {
        Ok(self.maintenance(backend)?.compact(levels).await?)
    }

    pub async fn run_garbage_collection(
        &self,
        backend: &str,
    ) -> Result<GcReport, OrchestratorError> {
        Ok(self.maintenance(backend)?.run_garbage_collection().await?)
    }
}
