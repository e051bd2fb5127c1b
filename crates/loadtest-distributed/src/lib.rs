//! Distributed load generation for kv-loadtest.
//!
//! A fan-out request is split across every replica matching a label
//! selector. Each replica receives one trigger call carrying its share of
//! the trace count and runs the load locally; the raw responses are
//! collected into a single report.
//!
//! ## Architecture
//!
//! ```text
//!            GET /gen-badger-load-all?traceCount=N
//!                           │
//!                           ▼
//!               ┌───────────────────────┐      discover(namespace, selector)
//!               │   FanoutCoordinator   │ ───────────────► ServiceRegistry
//!               └───────────────────────┘                  (Kubernetes | static)
//!                           │ per_replica = N / replicas
//!           ┌───────────────┼───────────────┐
//!           ▼               ▼               ▼
//!    ┌────────────┐  ┌────────────┐  ┌────────────┐
//!    │ replica 1  │  │ replica 2  │  │ replica M  │   PeerClient (HTTP GET)
//!    └────────────┘  └────────────┘  └────────────┘
//!           │               │               │
//!           └───────────────┼───────────────┘
//!                           ▼
//!                     FanoutReport (summary + one line per replica)
//! ```
//!
//! When no replica is found the coordinator falls back to a single
//! `localhost` target, so a standalone process still serves fan-out requests.

pub mod cli;
pub mod client;
pub mod coordinator;
pub mod error;
pub mod partitioner;
pub mod registry;
pub mod report;

pub use cli::FanoutArgs;
pub use client::{HttpPeerClient, PeerClient, DEFAULT_PEER_TIMEOUT};
pub use coordinator::{
    FanoutConfig, FanoutCoordinator, DEFAULT_LABEL_SELECTOR, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_NAMESPACE, DEFAULT_PEER_PORT,
};
pub use error::DistributedError;
pub use partitioner::{describe_split, per_replica_count, WorkCount, DEFAULT_PER_REPLICA};
pub use registry::{KubernetesRegistry, PeerEntry, ServiceRegistry, StaticRegistry};
pub use report::{FanoutReport, PeerOutcome, PeerStatus};
