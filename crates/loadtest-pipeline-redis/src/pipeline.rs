//! Wiring of the Redis store into a buffered pipeline.

use crate::args::RedisConfig;
use crate::error::RedisPipelineError;
use crate::store::{RedisReader, RedisStore};
use loadtest_pipeline::{BufferedPipeline, FlushPolicy, MetricsSink};
use std::sync::Arc;

pub type RedisPipeline = BufferedPipeline<RedisStore>;

/// Connect and build a pipeline plus a reader on its own connection.
pub async fn open_pipeline(
    config: RedisConfig,
    policy: FlushPolicy,
    metrics: Arc<dyn MetricsSink>,
) -> Result<(Arc<RedisPipeline>, RedisReader), RedisPipelineError> {
    let reader = RedisReader::connect(&config).await?;
    let store = RedisStore::connect(config).await?;
    Ok((Arc::new(BufferedPipeline::new(store, policy, metrics)), reader))
}
