//! Batched write pipeline for the kv-loadtest framework.
//!
//! A pipeline amortizes many logical span writes into periodic bulk commits
//! against one backend. Writes are encoded and buffered by [`BatchPipeline::put`];
//! the buffer is committed when it holds more than `batch_size` entries (from
//! the write path) or when it is non-empty and older than the flush interval
//! (from the [`PipelineDriver`] ticker).
//!
//! ```text
//!   put ──► WriteBuffer ──(count > batch_size)──┐
//!              ▲                                ├──► BulkStore::commit
//!   PipelineDriver tick ──(elapsed ≥ interval)──┘        │
//!                                                        ▼
//!                                               fjall / redis / memory
//! ```
//!
//! Backends implement [`BulkStore`] and are wrapped in a [`BufferedPipeline`].
//! Read access and maintenance are separate seams ([`EntryReader`],
//! [`Maintenance`]) so they never contend for the pipeline lock.

pub mod buffer;
pub mod driver;
pub mod error;
pub mod maintenance;
pub mod memory;
pub mod metrics;
pub mod pipeline;
pub mod reporter;
pub mod store;

pub use buffer::WriteBuffer;
pub use driver::{PipelineDriver, MIN_TICK};
pub use error::PipelineError;
pub use maintenance::{CompactionReport, EntryReader, GcReport, Maintenance};
pub use memory::{MemoryStore, MEMORY_BACKEND};
pub use metrics::{FanoutSink, MetricsSink, PipelineStats, PrometheusSink, StatsSnapshot};
pub use pipeline::{
    BatchPipeline, BufferedPipeline, FlushOutcome, FlushPolicy, DEFAULT_BATCH_SIZE,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_TTL,
};
pub use reporter::{
    spawn_throughput_reporter, ThroughputSample, ThroughputTracker, DEFAULT_REPORT_INTERVAL,
};
pub use store::{BulkStore, PendingWrite};
