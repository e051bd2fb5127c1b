//! Metrics sinks for pipeline activity.
//!
//! Pipelines receive their sink at construction; nothing here is global.
//! [`PipelineStats`] keeps lock-free totals for the throughput reporter,
//! [`PrometheusSink`] owns a private registry rendered by the `/metrics`
//! route, and [`FanoutSink`] forwards to several sinks at once.

use crate::error::PipelineError;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receiver of pipeline counters.
pub trait MetricsSink: Send + Sync {
    /// A bulk commit of `objects` entries succeeded.
    fn record_flush(&self, backend: &str, operation: &str, objects: u64);

    /// `objects` entries were accepted by `put`.
    fn record_write_request(&self, backend: &str, objects: u64);

    /// A bulk commit failed.
    fn record_flush_failure(&self, backend: &str);
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub flushes: u64,
    pub objects: u64,
    pub write_requests: u64,
    pub failed_flushes: u64,
}

/// Atomic totals for one pipeline.
#[derive(Debug, Default)]
pub struct PipelineStats {
    flushes: AtomicU64,
    objects: AtomicU64,
    write_requests: AtomicU64,
    failed_flushes: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            flushes: self.flushes.load(Ordering::Relaxed),
            objects: self.objects.load(Ordering::Relaxed),
            write_requests: self.write_requests.load(Ordering::Relaxed),
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSink for PipelineStats {
    fn record_flush(&self, _backend: &str, _operation: &str, objects: u64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.objects.fetch_add(objects, Ordering::Relaxed);
    }

    fn record_write_request(&self, _backend: &str, objects: u64) {
        self.write_requests.fetch_add(objects, Ordering::Relaxed);
    }

    fn record_flush_failure(&self, _backend: &str) {
        self.failed_flushes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Prometheus counters in a registry owned by this sink.
///
/// Exposed series:
/// - `loadtest_writes_total{backend,method}` - successful bulk commits
/// - `loadtest_objects_total{backend,method}` - entries committed
/// - `loadtest_write_requests_total{backend}` - entries accepted by `put`
/// - `loadtest_flush_failures_total{backend}` - failed bulk commits
#[derive(Clone)]
pub struct PrometheusSink {
    registry: Registry,
    writes: IntCounterVec,
    objects: IntCounterVec,
    write_requests: IntCounterVec,
    flush_failures: IntCounterVec,
}

impl PrometheusSink {
    pub fn new() -> Result<Self, PipelineError> {
        let registry = Registry::new();

        let writes = IntCounterVec::new(
            Opts::new("loadtest_writes_total", "Bulk commits issued per backend"),
            &["backend", "method"],
        )?;
        registry.register(Box::new(writes.clone()))?;

        let objects = IntCounterVec::new(
            Opts::new("loadtest_objects_total", "Entries committed per backend"),
            &["backend", "method"],
        )?;
        registry.register(Box::new(objects.clone()))?;

        let write_requests = IntCounterVec::new(
            Opts::new(
                "loadtest_write_requests_total",
                "Entries accepted into a pipeline buffer",
            ),
            &["backend"],
        )?;
        registry.register(Box::new(write_requests.clone()))?;

        let flush_failures = IntCounterVec::new(
            Opts::new("loadtest_flush_failures_total", "Failed bulk commits"),
            &["backend"],
        )?;
        registry.register(Box::new(flush_failures.clone()))?;

        Ok(Self {
            registry,
            writes,
            objects,
            write_requests,
            flush_failures,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, PipelineError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| PipelineError::Metrics(prometheus::Error::Msg(e.to_string())))
    }
}

impl MetricsSink for PrometheusSink {
    fn record_flush(&self, backend: &str, operation: &str, objects: u64) {
        self.writes.with_label_values(&[backend, operation]).inc();
        self.objects
            .with_label_values(&[backend, operation])
            .inc_by(objects);
    }

    fn record_write_request(&self, backend: &str, objects: u64) {
        self.write_requests
            .with_label_values(&[backend])
            .inc_by(objects);
    }

    fn record_flush_failure(&self, backend: &str) {
        self.flush_failures.with_label_values(&[backend]).inc();
    }
}

/// Forwards every event to each wrapped sink.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn MetricsSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl MetricsSink for FanoutSink {
    fn record_flush(&self, backend: &str, operation: &str, objects: u64) {
        for sink in &self.sinks {
            sink.record_flush(backend, operation, objects);
        }
    }

    fn record_write_request(&self, backend: &str, objects: u64) {
        for sink in &self.sinks {
            sink.record_write_request(backend, objects);
        }
    }

    fn record_flush_failure(&self, backend: &str) {
        for sink in &self.sinks {
            sink.record_flush_failure(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_snapshot() {
        let stats = PipelineStats::new();
        stats.record_write_request("memory", 1);
        stats.record_write_request("memory", 1);
        stats.record_flush("memory", "flush", 2);
        stats.record_flush_failure("memory");

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                flushes: 1,
                objects: 2,
                write_requests: 2,
                failed_flushes: 1,
            }
        );
    }

    #[test]
    fn test_prometheus_render() {
        let sink = PrometheusSink::new().unwrap();
        sink.record_flush("redis", "flush", 100);
        sink.record_write_request("redis", 3);

        let text = sink.render().unwrap();
        assert!(text.contains("loadtest_writes_total{backend=\"redis\",method=\"flush\"} 1"));
        assert!(text.contains("loadtest_objects_total{backend=\"redis\",method=\"flush\"} 100"));
        assert!(text.contains("loadtest_write_requests_total{backend=\"redis\"} 3"));
    }

    #[test]
    fn test_separate_registries_do_not_collide() {
        let first = PrometheusSink::new().unwrap();
        let second = PrometheusSink::new().unwrap();
        first.record_flush("fjall", "flush", 5);

        assert!(!second.render().unwrap().contains("fjall"));
    }

    #[test]
    fn test_fanout_forwards_to_all() {
        let a = Arc::new(PipelineStats::new());
        let b = Arc::new(PipelineStats::new());
        let fanout = FanoutSink::new(vec![a.clone()]).with(b.clone());

        fanout.record_flush("memory", "flush", 4);
        assert_eq!(a.snapshot().objects, 4);
        assert_eq!(b.snapshot().objects, 4);
    }
}
