//! kv-loadtest Library
//!
//! A load generator that synthesizes trace-shaped records and writes them to
//! key-value stores through batched, self-flushing pipelines.
//!
//! # Features
//!
//! - Batched writes: count and time thresholds, drain on shutdown
//! - Backends: embedded fjall keyspace, Redis, in-memory dry runs
//! - Fan-out: one request split across every replica found by label selector
//! - Maintenance: reads by key, counts, compaction and garbage collection
//!
//! # Backend Crates
//!
//! - `loadtest_pipeline` - pipeline contract, buffer, driver, metrics sinks
//! - `loadtest_pipeline_fjall` - embedded backend with expiry envelopes
//! - `loadtest_pipeline_redis` - Redis backend over pipelined `SET ... EX`
//! - `loadtest_distributed` - replica discovery and fan-out
//!
//! # CLI Usage
//!
//! ```bash
//! # Serve the trigger surface with both backends
//! kv-loadtest serve --enable-fjall --enable-redis --redis-url redis://localhost:6379/0
//!
//! # Write 100 traces to the embedded keyspace and print the report
//! kv-loadtest generate --backend fjall --trace-count 100 --fjall-path ./data/fjall
//!
//! # Split 300 traces across every replica
//! kv-loadtest fanout --backend redis --trace-count 300
//! ```

pub mod backends;
pub mod config;
pub mod jobs;
pub mod loadtest;
pub mod orchestrator;
pub mod server;

pub use backends::{BackendKind, BackendSet};
pub use config::{AppConfig, ConfigArgs};
pub use jobs::{JobRecord, JobStatus, JobTracker};
pub use orchestrator::{
    BackendTarget, FailurePolicy, GenerateReport, LoadOrchestrator, OrchestratorError,
};
pub use server::{router, AppState};
