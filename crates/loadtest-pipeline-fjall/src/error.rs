//! Error types for the fjall backend.

use loadtest_pipeline::PipelineError;
use thiserror::Error;

/// Errors that can occur inside the embedded engine backend.
#[derive(Error, Debug)]
pub enum FjallPipelineError {
    /// Keyspace, partition, batch or GC error from fjall.
    #[error("fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    /// Stored bytes shorter than the expiry header.
    #[error("Corrupt value envelope for key '{key}' ({len} bytes)")]
    CorruptEnvelope { key: String, len: usize },

    /// `compact` called with zero levels.
    #[error("Compaction needs at least one level")]
    InvalidCompactionLevels,

    /// The blocking worker running a fjall call panicked or was cancelled.
    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Which pipeline operation a fjall error surfaced from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Stage {
    Open,
    Flush,
    Close,
    Read,
    Maintenance,
}

impl FjallPipelineError {
    pub(crate) fn into_pipeline(self, stage: Stage) -> PipelineError {
        let backend = crate::FJALL_BACKEND;
        match stage {
            Stage::Open => PipelineError::unavailable(backend, self),
            Stage::Flush => PipelineError::flush(backend, self),
            Stage::Close => PipelineError::close(backend, self),
            Stage::Read => PipelineError::read(backend, self),
            Stage::Maintenance => PipelineError::maintenance(backend, self),
        }
    }
}

/// Errors raised while opening the keyspace surface as an unavailable backend.
impl From<FjallPipelineError> for PipelineError {
    fn from(e: FjallPipelineError) -> Self {
        e.into_pipeline(Stage::Open)
    }
}
