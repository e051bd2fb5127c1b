//! Redis backend for the kv-loadtest write pipeline.
//!
//! Each flush is sent as one `MULTI`/`EXEC` pipeline of `SET key value EX ttl`
//! commands over a multiplexed tokio connection. Connection health is probed
//! with `PING` before buffering and before committing; a lost connection is
//! re-created once and the failed operation retried once.

pub mod args;
pub mod error;
pub mod pipeline;
pub mod store;

pub use args::{
    mask_connection_password, RedisArgs, RedisConfig, DEFAULT_PROBE_INTERVAL, DEFAULT_REDIS_URL,
};
pub use error::RedisPipelineError;
pub use pipeline::{open_pipeline, RedisPipeline};
pub use store::{RedisReader, RedisStore};

/// Backend label used in logs and metrics.
pub const REDIS_BACKEND: &str = "redis";
