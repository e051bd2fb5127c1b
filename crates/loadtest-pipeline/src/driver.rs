//! Periodic tasks bound to a pipeline.
//!
//! The driver is the only source of time-based flushes. It ticks at the
//! pipeline's flush interval until the shutdown token is cancelled, then
//! drains the pipeline with a forced flush and closes it.

use crate::pipeline::{BatchPipeline, FlushOutcome};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Shortest tick any periodic task runs at.
pub const MIN_TICK: Duration = Duration::from_millis(1);

/// Handle to a spawned periodic task.
pub struct PipelineDriver {
    name: String,
    handle: JoinHandle<()>,
}

impl PipelineDriver {
    /// Spawn the flush ticker for `pipeline`.
    ///
    /// On cancellation the ticker stops, then `force_flush` and `close` run
    /// before the task finishes. `interval` is clamped to [`MIN_TICK`].
    pub fn spawn(
        pipeline: Arc<dyn BatchPipeline>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        let name = format!("{}-flush", pipeline.backend());
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_TICK));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let FlushOutcome::Committed(n) = pipeline.flush().await {
                            debug!(task = %task_name, committed = n, "Periodic flush");
                        }
                    }
                }
            }

            match pipeline.force_flush().await {
                FlushOutcome::Committed(n) => {
                    info!(task = %task_name, committed = n, "Drained pipeline on shutdown")
                }
                FlushOutcome::Failed => {
                    let lost = pipeline.pending().await;
                    error!(task = %task_name, lost, "Final flush failed on shutdown")
                }
                FlushOutcome::Skipped => {}
            }
            if let Err(e) = pipeline.close().await {
                warn!(task = %task_name, "Failed to close pipeline: {e}");
            }
        });

        Self { name, handle }
    }

    /// Spawn a generic periodic task that runs `task` on every tick until
    /// `shutdown` is cancelled. The first run happens one `interval` after
    /// spawning. `interval` is clamped to [`MIN_TICK`].
    pub fn spawn_periodic<F, Fut>(
        name: impl Into<String>,
        interval: Duration,
        shutdown: CancellationToken,
        mut task: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_TICK));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => task().await,
                }
            }
            debug!(task = %task_name, "Periodic task stopped");
        });

        Self { name, handle }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the task to finish (including the drain after cancellation).
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!(task = %self.name, "Periodic task panicked or was aborted: {e}");
        }
    }
}
