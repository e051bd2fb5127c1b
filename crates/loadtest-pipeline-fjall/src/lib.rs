//! Embedded fjall backend for the kv-loadtest write pipeline.
//!
//! Spans are written to a single `spans` partition opened with key/value
//! separation, so large payloads live in a value log that garbage collection
//! can reclaim. Each flush is one atomic fjall batch followed by a journal
//! persist. Values are framed with an expiry header (see [`envelope`]) because
//! the engine has no native TTL; expired entries are invisible to reads and
//! are swept by garbage collection.
//!
//! All fjall calls run on the blocking thread pool.

pub mod args;
pub mod envelope;
pub mod error;
pub mod pipeline;
pub mod store;

pub use args::{FjallArgs, FjallConfig, DEFAULT_GC_INTERVAL, DEFAULT_GC_SPACE_AMP_TARGET};
pub use error::FjallPipelineError;
pub use pipeline::{open_pipeline, spawn_gc_ticker, FjallPipeline};
pub use store::{FjallHandle, FjallStore, SPANS_PARTITION};

/// Backend label used in logs and metrics.
pub const FJALL_BACKEND: &str = "fjall";
