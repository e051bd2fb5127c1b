//! Error types for the batched write pipeline.

use span_record::RecordError;
use thiserror::Error;

/// Errors surfaced by pipelines, stores and readers.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The span could not be encoded. The item is dropped.
    #[error("Serialization error: {0}")]
    Serialization(#[from] RecordError),

    /// The backend connection is gone and could not be re-established.
    #[error("Backend '{backend}' unavailable: {message}")]
    BackendUnavailable { backend: String, message: String },

    /// A bulk commit failed. Buffered entries are kept for the next attempt.
    #[error("Flush to '{backend}' failed: {message}")]
    Flush { backend: String, message: String },

    /// Releasing the backend handle failed.
    #[error("Closing '{backend}' failed: {message}")]
    Close { backend: String, message: String },

    /// The pipeline was closed and no longer accepts writes.
    #[error("Pipeline for '{0}' is closed")]
    Closed(String),

    /// A read-side operation failed.
    #[error("Read from '{backend}' failed: {message}")]
    Read { backend: String, message: String },

    /// A maintenance operation (compaction, garbage collection) failed.
    #[error("Maintenance on '{backend}' failed: {message}")]
    Maintenance { backend: String, message: String },

    /// Metrics registration or encoding error.
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl PipelineError {
    pub fn unavailable(backend: &str, message: impl ToString) -> Self {
        Self::BackendUnavailable {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }

    pub fn flush(backend: &str, message: impl ToString) -> Self {
        Self::Flush {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }

    pub fn close(backend: &str, message: impl ToString) -> Self {
        Self::Close {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }

    pub fn read(backend: &str, message: impl ToString) -> Self {
        Self::Read {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }

    pub fn maintenance(backend: &str, message: impl ToString) -> Self {
        Self::Maintenance {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }
}
