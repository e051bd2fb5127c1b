//! Opening the configured backends with their periodic tasks.

use crate::config::AppConfig;
use crate::orchestrator::BackendTarget;
use anyhow::Context;
use loadtest_pipeline::{
    spawn_throughput_reporter, BufferedPipeline, FanoutSink, MemoryStore, MetricsSink,
    PipelineDriver, PipelineStats, PrometheusSink, DEFAULT_REPORT_INTERVAL, MEMORY_BACKEND,
};
use loadtest_pipeline_fjall::FJALL_BACKEND;
use loadtest_pipeline_redis::REDIS_BACKEND;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Backends a pipeline can be opened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum BackendKind {
    /// Embedded fjall keyspace
    Fjall,
    /// Redis server
    Redis,
    /// In-process map for dry runs
    Memory,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fjall => FJALL_BACKEND,
            Self::Redis => REDIS_BACKEND,
            Self::Memory => MEMORY_BACKEND,
        }
    }

    /// Backends enabled by `config`. The memory backend is always available.
    pub fn enabled(config: &AppConfig) -> Vec<Self> {
        let mut kinds = Vec::new();
        if config.fjall.enabled {
            kinds.push(Self::Fjall);
        }
        if config.redis.enabled {
            kinds.push(Self::Redis);
        }
        kinds.push(Self::Memory);
        kinds
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open pipelines plus the drivers, reporters and tickers bound to them.
///
/// Cancelling the shutdown token passed to [`BackendSet::open`] stops every
/// task; [`BackendSet::shutdown`] then waits for the final flushes.
pub struct BackendSet {
    targets: BTreeMap<String, BackendTarget>,
    prometheus: Arc<PrometheusSink>,
    drivers: Vec<PipelineDriver>,
}

impl BackendSet {
    pub async fn open(
        config: &AppConfig,
        kinds: &[BackendKind],
        shutdown: CancellationToken,
    ) -> anyhow::Result<Self> {
        let prometheus = Arc::new(PrometheusSink::new().context("Failed to register metrics")?);
        let mut set = Self {
            targets: BTreeMap::new(),
            prometheus,
            drivers: Vec::new(),
        };
        let policy = config.flush_policy();

        for kind in kinds {
            let backend = kind.as_str();
            let stats = Arc::new(PipelineStats::new());
            let metrics: Arc<dyn MetricsSink> = Arc::new(FanoutSink::new(vec![
                stats.clone() as Arc<dyn MetricsSink>,
                set.prometheus.clone() as Arc<dyn MetricsSink>,
            ]));

            let target = match kind {
                BackendKind::Fjall => {
                    let fjall_config = config.fjall_config();
                    let (pipeline, handle) =
                        loadtest_pipeline_fjall::open_pipeline(&fjall_config, policy, metrics)
                            .with_context(|| {
                                format!("Failed to open fjall keyspace at {:?}", fjall_config.path)
                            })?;
                    set.drivers.push(loadtest_pipeline_fjall::spawn_gc_ticker(
                        handle.clone(),
                        &fjall_config,
                        shutdown.clone(),
                    ));
                    let handle = Arc::new(handle);
                    BackendTarget::new(pipeline)
                        .with_reader(handle.clone())
                        .with_maintenance(handle)
                }
                BackendKind::Redis => {
                    let redis_config = config.redis_config();
                    let display_url = redis_config.display_url();
                    let (pipeline, reader) =
                        loadtest_pipeline_redis::open_pipeline(redis_config, policy, metrics)
                            .await
                            .with_context(|| format!("Failed to connect to Redis at {display_url}"))?;
                    BackendTarget::new(pipeline).with_reader(Arc::new(reader))
                }
                BackendKind::Memory => {
                    let store = MemoryStore::new();
                    let pipeline = BufferedPipeline::new(store.clone(), policy, metrics);
                    BackendTarget::new(Arc::new(pipeline)).with_reader(Arc::new(store))
                }
            };

            set.drivers.push(PipelineDriver::spawn(
                target.pipeline.clone(),
                policy.interval,
                shutdown.clone(),
            ));
            set.drivers.push(spawn_throughput_reporter(
                backend,
                stats,
                DEFAULT_REPORT_INTERVAL,
                shutdown.clone(),
            ));
            info!(
                backend,
                batch_size = policy.batch_size,
                interval_ms = policy.interval.as_millis() as u64,
                "Backend pipeline ready"
            );

            set.targets.insert(backend.to_string(), target);
        }

        Ok(set)
    }

    pub fn targets(&self) -> &BTreeMap<String, BackendTarget> {
        &self.targets
    }

    pub fn prometheus(&self) -> Arc<PrometheusSink> {
        self.prometheus.clone()
    }

    /// Wait for every task to stop. Flush drivers drain and close their
    /// pipelines first, so call this after cancelling the shutdown token.
    pub async fn shutdown(self) {
        let names: Vec<String> = self.drivers.iter().map(|d| d.name().to_string()).collect();
        futures::future::join_all(self.drivers.into_iter().map(PipelineDriver::join)).await;
        info!(tasks = ?names, "Backend tasks stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_backends() {
        let mut config = AppConfig::default();
        assert_eq!(BackendKind::enabled(&config), vec![BackendKind::Memory]);

        config.fjall.enabled = true;
        config.redis.enabled = true;
        assert_eq!(
            BackendKind::enabled(&config),
            vec![BackendKind::Fjall, BackendKind::Redis, BackendKind::Memory]
        );
    }

    #[tokio::test]
    async fn test_memory_backend_drains_on_shutdown() {
        let shutdown = CancellationToken::new();
        let set = BackendSet::open(&AppConfig::default(), &[BackendKind::Memory], shutdown.clone())
            .await
            .unwrap();
        let target = set.targets()[MEMORY_BACKEND].clone();
        let span = span_record::Span::new(span_record::SpanKind::Server, "svc", "op", "");
        target.pipeline.put("g", "1", &span).await.unwrap();
        assert_eq!(target.pipeline.pending().await, 1);

        shutdown.cancel();
        set.shutdown().await;

        assert_eq!(target.pipeline.pending().await, 0);
        let reader = target.reader.unwrap();
        assert_eq!(reader.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fjall_backend_exposes_maintenance() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.fjall.path = dir.path().join("fjall");

        let shutdown = CancellationToken::new();
        let set = BackendSet::open(&config, &[BackendKind::Fjall], shutdown.clone())
            .await
            .unwrap();
        let target = set.targets()[FJALL_BACKEND].clone();
        assert!(target.reader.is_some());
        assert!(target.maintenance.is_some());

        shutdown.cancel();
        set.shutdown().await;
    }
}
