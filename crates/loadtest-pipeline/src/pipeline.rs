//! The batched write pipeline.

use crate::buffer::WriteBuffer;
use crate::error::PipelineError;
use crate::metrics::MetricsSink;
use crate::store::{BulkStore, PendingWrite};
use span_record::{storage_key, Span};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Default number of pending entries above which `put` flushes.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default staleness after which the driver flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(1000);

/// Default time-to-live of written entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(900);

/// Count and time thresholds of a pipeline plus the TTL it stamps on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    pub batch_size: usize,
    pub interval: Duration,
    /// `None` writes entries that never expire.
    pub ttl: Option<Duration>,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            interval: DEFAULT_FLUSH_INTERVAL,
            ttl: Some(DEFAULT_TTL),
        }
    }
}

/// What a flush call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing pending, thresholds not reached, or the pipeline is closed.
    Skipped,
    /// This many entries were committed and removed from the buffer.
    Committed(usize),
    /// The commit failed and the buffer was left untouched.
    Failed,
}

/// Capability contract shared by every backend.
#[async_trait::async_trait]
pub trait BatchPipeline: Send + Sync {
    fn backend(&self) -> &str;

    /// Encode and buffer `span` under `group_id-item_id`.
    ///
    /// Flushes before returning when the pending count exceeds the batch
    /// size. A failed flush is logged, not returned: the span was buffered.
    async fn put(&self, group_id: &str, item_id: &str, span: &Span) -> Result<(), PipelineError>;

    /// Commit the buffer if it is due under the flush policy.
    async fn flush(&self) -> FlushOutcome;

    /// Commit the buffer regardless of thresholds.
    async fn force_flush(&self) -> FlushOutcome;

    /// Release the backend handle. Later calls are no-ops.
    async fn close(&self) -> Result<(), PipelineError>;

    /// Current pending count.
    async fn pending(&self) -> usize;
}

struct Inner<S> {
    store: S,
    buffer: WriteBuffer,
    closed: bool,
}

/// [`BatchPipeline`] over any [`BulkStore`].
///
/// All buffer mutations and the commit/drain sequence run under one async
/// mutex, so a flush commits exactly the entries present when it took the
/// lock and entries put afterwards stay pending.
pub struct BufferedPipeline<S: BulkStore> {
    backend: String,
    policy: FlushPolicy,
    metrics: Arc<dyn MetricsSink>,
    inner: Mutex<Inner<S>>,
}

impl<S: BulkStore> BufferedPipeline<S> {
    pub fn new(store: S, policy: FlushPolicy, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            backend: store.backend().to_string(),
            policy,
            metrics,
            inner: Mutex::new(Inner {
                store,
                buffer: WriteBuffer::new(),
                closed: false,
            }),
        }
    }

    pub fn policy(&self) -> &FlushPolicy {
        &self.policy
    }

    /// Flush with the lock already held.
    async fn flush_locked(&self, inner: &mut Inner<S>, force: bool) -> FlushOutcome {
        if inner.closed {
            return FlushOutcome::Skipped;
        }
        let pending = inner.buffer.len();
        if pending == 0 {
            return FlushOutcome::Skipped;
        }
        if !force && !inner.buffer.is_due(self.policy.batch_size, self.policy.interval) {
            return FlushOutcome::Skipped;
        }

        if let Err(e) = inner.store.ensure_ready().await {
            error!(backend = %self.backend, pending, "Flush skipped, backend not ready: {e}");
            self.metrics.record_flush_failure(&self.backend);
            return FlushOutcome::Failed;
        }

        let since_last = inner.buffer.since_last_flush();
        match inner.store.commit(inner.buffer.entries()).await {
            Ok(()) => {
                inner.buffer.drain(pending);
                self.metrics
                    .record_flush(&self.backend, "flush", pending as u64);
                debug!(
                    backend = %self.backend,
                    committed = pending,
                    since_last_ms = since_last.as_millis() as u64,
                    "Flushed pending writes"
                );
                FlushOutcome::Committed(pending)
            }
            Err(e) => {
                error!(backend = %self.backend, pending, "Flush failed, keeping buffer: {e}");
                self.metrics.record_flush_failure(&self.backend);
                FlushOutcome::Failed
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: BulkStore> BatchPipeline for BufferedPipeline<S> {
    fn backend(&self) -> &str {
        &self.backend
    }

    async fn put(&self, group_id: &str, item_id: &str, span: &Span) -> Result<(), PipelineError> {
        let value = span.to_bytes()?;
        let write = PendingWrite::new(storage_key(group_id, item_id), value, self.policy.ttl);

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if inner.closed {
            return Err(PipelineError::Closed(self.backend.clone()));
        }
        inner.store.ensure_ready().await?;

        let pending = inner.buffer.push(write);
        self.metrics.record_write_request(&self.backend, 1);

        if pending > self.policy.batch_size {
            self.flush_locked(inner, false).await;
        }
        Ok(())
    }

    async fn flush(&self) -> FlushOutcome {
        let mut guard = self.inner.lock().await;
        self.flush_locked(&mut guard, false).await
    }

    async fn force_flush(&self) -> FlushOutcome {
        let mut guard = self.inner.lock().await;
        self.flush_locked(&mut guard, true).await
    }

    async fn close(&self) -> Result<(), PipelineError> {
        let mut guard = self.inner.lock().await;
        if guard.closed {
            return Ok(());
        }
        guard.closed = true;
        let dropped = guard.buffer.len();
        if dropped > 0 {
            error!(backend = %self.backend, dropped, "Closing with unflushed writes");
        }
        guard.store.close().await
    }

    async fn pending(&self) -> usize {
        self.inner.lock().await.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::metrics::PipelineStats;
    use span_record::SpanKind;

    fn span() -> Span {
        Span::new(SpanKind::Server, "svc", "op", "")
    }

    fn pipeline(batch_size: usize, interval: Duration) -> (BufferedPipeline<MemoryStore>, Arc<PipelineStats>) {
        let stats = Arc::new(PipelineStats::new());
        let policy = FlushPolicy {
            batch_size,
            interval,
            ttl: None,
        };
        (BufferedPipeline::new(MemoryStore::new(), policy, stats.clone()), stats)
    }

    #[tokio::test]
    async fn test_flush_skips_when_empty() {
        let (pipeline, stats) = pipeline(10, Duration::ZERO);
        assert_eq!(pipeline.flush().await, FlushOutcome::Skipped);
        assert_eq!(pipeline.force_flush().await, FlushOutcome::Skipped);
        assert_eq!(stats.snapshot().flushes, 0);
    }

    #[tokio::test]
    async fn test_flush_waits_for_thresholds() {
        let (pipeline, _) = pipeline(10, Duration::from_secs(3600));
        pipeline.put("g", "1", &span()).await.unwrap();

        assert_eq!(pipeline.flush().await, FlushOutcome::Skipped);
        assert_eq!(pipeline.pending().await, 1);
        assert_eq!(pipeline.force_flush().await, FlushOutcome::Committed(1));
        assert_eq!(pipeline.pending().await, 0);
    }

    #[tokio::test]
    async fn test_put_flushes_above_batch_size() {
        let (pipeline, stats) = pipeline(3, Duration::from_secs(3600));
        for i in 0..3 {
            pipeline.put("g", &i.to_string(), &span()).await.unwrap();
        }
        assert_eq!(pipeline.pending().await, 3);

        pipeline.put("g", "3", &span()).await.unwrap();
        assert_eq!(pipeline.pending().await, 0);
        assert_eq!(stats.snapshot().objects, 4);
    }

    #[tokio::test]
    async fn test_put_after_close_is_rejected() {
        let (pipeline, _) = pipeline(10, Duration::ZERO);
        pipeline.close().await.unwrap();
        pipeline.close().await.unwrap();

        let result = pipeline.put("g", "1", &span()).await;
        assert!(matches!(result, Err(PipelineError::Closed(_))));
    }
}
