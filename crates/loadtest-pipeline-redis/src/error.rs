//! Error types for the Redis backend.

use loadtest_pipeline::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedisPipelineError {
    /// Redis client, connection or command error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// PING answered with something other than PONG.
    #[error("Unexpected PING reply: {0}")]
    UnexpectedPing(String),
}

impl RedisPipelineError {
    /// Whether the error means the connection itself is unusable.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Redis(e) => {
                e.is_io_error()
                    || e.is_connection_dropped()
                    || e.is_connection_refusal()
                    || e.is_timeout()
            }
            Self::UnexpectedPing(_) => true,
        }
    }
}

impl From<RedisPipelineError> for PipelineError {
    fn from(e: RedisPipelineError) -> Self {
        PipelineError::unavailable(crate::REDIS_BACKEND, e)
    }
}
