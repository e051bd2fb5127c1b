//! Wiring of the fjall store into a buffered pipeline plus its GC ticker.

use crate::args::FjallConfig;
use crate::error::FjallPipelineError;
use crate::store::{FjallHandle, FjallStore};
use loadtest_pipeline::{BufferedPipeline, FlushPolicy, Maintenance, MetricsSink, PipelineDriver};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub type FjallPipeline = BufferedPipeline<FjallStore>;

/// Open the keyspace and build a pipeline over it.
///
/// The returned handle shares the keyspace with the pipeline and serves
/// reads and maintenance without taking the pipeline lock.
pub fn open_pipeline(
    config: &FjallConfig,
    policy: FlushPolicy,
    metrics: Arc<dyn MetricsSink>,
) -> Result<(Arc<FjallPipeline>, FjallHandle), FjallPipelineError> {
    let handle = FjallHandle::open(config)?;
    let pipeline = BufferedPipeline::new(FjallStore::new(handle.clone()), policy, metrics);
    Ok((Arc::new(pipeline), handle))
}

/// Spawn the periodic garbage collection task for `handle`.
pub fn spawn_gc_ticker(
    handle: FjallHandle,
    config: &FjallConfig,
    shutdown: CancellationToken,
) -> PipelineDriver {
    PipelineDriver::spawn_periodic("fjall-gc", config.gc_interval, shutdown, move || {
        let handle = handle.clone();
        async move {
            if let Err(e) = handle.run_garbage_collection().await {
                warn!("Periodic garbage collection failed: {e}");
            }
        }
    })
}
