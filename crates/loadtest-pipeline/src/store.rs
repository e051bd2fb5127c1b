//! The bulk-commit seam every backend implements.

use crate::error::PipelineError;
use std::time::{Duration, SystemTime};

/// One buffered write: an encoded span under its composite key.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub key: String,
    pub value: Vec<u8>,
    /// Time-to-live applied from `written_at`. `None` never expires.
    pub ttl: Option<Duration>,
    pub written_at: SystemTime,
}

impl PendingWrite {
    pub fn new(key: String, value: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            key,
            value,
            ttl,
            written_at: SystemTime::now(),
        }
    }

    /// Absolute expiry, if the write has a TTL.
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.ttl.map(|ttl| self.written_at + ttl)
    }
}

/// Backend half of a [`BufferedPipeline`](crate::BufferedPipeline).
///
/// A store is owned by exactly one pipeline and only ever called while the
/// pipeline lock is held, so implementations take `&mut self` and need no
/// synchronization of their own.
#[async_trait::async_trait]
pub trait BulkStore: Send + 'static {
    /// Short backend label used in logs and metrics (`fjall`, `redis`, ...).
    fn backend(&self) -> &str;

    /// Make sure the handle is usable before buffering or committing.
    ///
    /// Remote stores probe their connection here and reconnect once on
    /// failure. Embedded stores are always ready.
    async fn ensure_ready(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Commit `batch` atomically as one bulk operation.
    ///
    /// On error nothing may be assumed persisted; the caller keeps the batch.
    async fn commit(&mut self, batch: &[PendingWrite]) -> Result<(), PipelineError>;

    /// Release the backend handle. Must tolerate repeated calls.
    async fn close(&mut self) -> Result<(), PipelineError>;
}
