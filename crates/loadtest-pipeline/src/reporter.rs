//! Periodic throughput logging.

use crate::driver::PipelineDriver;
use crate::metrics::{PipelineStats, StatsSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Default period of the throughput reporter.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Rates observed over one reporting window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSample {
    pub flushes: u64,
    pub objects: u64,
    pub flushes_per_sec: f64,
    pub objects_per_sec: f64,
}

/// Turns successive [`PipelineStats`] snapshots into per-window rates.
pub struct ThroughputTracker {
    stats: Arc<PipelineStats>,
    previous: StatsSnapshot,
    previous_at: Instant,
}

impl ThroughputTracker {
    pub fn new(stats: Arc<PipelineStats>) -> Self {
        let previous = stats.snapshot();
        Self {
            stats,
            previous,
            previous_at: Instant::now(),
        }
    }

    /// Rates since the previous sample, or `None` when nothing was flushed.
    pub fn sample(&mut self) -> Option<ThroughputSample> {
        let current = self.stats.snapshot();
        let now = Instant::now();
        let elapsed = now.duration_since(self.previous_at).as_secs_f64();

        let flushes = current.flushes.saturating_sub(self.previous.flushes);
        let objects = current.objects.saturating_sub(self.previous.objects);
        self.previous = current;
        self.previous_at = now;

        if flushes == 0 {
            return None;
        }
        let rate = |count: u64| {
            if elapsed > 0.0 {
                count as f64 / elapsed
            } else {
                0.0
            }
        };
        Some(ThroughputSample {
            flushes,
            objects,
            flushes_per_sec: rate(flushes),
            objects_per_sec: rate(objects),
        })
    }
}

/// Spawn a task logging flush and object rates of `backend` every `interval`.
/// Idle windows are skipped.
pub fn spawn_throughput_reporter(
    backend: &str,
    stats: Arc<PipelineStats>,
    interval: Duration,
    shutdown: CancellationToken,
) -> PipelineDriver {
    let backend = backend.to_string();
    let mut tracker = ThroughputTracker::new(stats);

    PipelineDriver::spawn_periodic(
        format!("{backend}-throughput"),
        interval,
        shutdown,
        move || {
            if let Some(sample) = tracker.sample() {
                info!(
                    backend = %backend,
                    flushes = sample.flushes,
                    objects = sample.objects,
                    flushes_per_sec = %format!("{:.2}", sample.flushes_per_sec),
                    objects_per_sec = %format!("{:.2}", sample.objects_per_sec),
                    "Write throughput"
                );
            }
            std::future::ready(())
        },
    )
}
