//! Span generator for the kv-loadtest framework.
//!
//! This crate provides the [`SpanGenerator`] which synthesizes trace-shaped
//! load: fresh trace ids, span ids, and span payloads whose parent reference
//! chains each span to the previous one in the same trace. The generator uses
//! a seeded RNG so a run can be reproduced with the same seed.
//!
//! # Architecture
//!
//! ```text
//!        seed
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  SpanGenerator  │
//! │                 │
//! │  - rng (StdRng) │
//! │  - index        │
//! └────────┬────────┘
//!          │ trace(spans_per_trace)
//!          ▼
//!   GeneratedSpan { key: SpanKey, span: Span }   (parent = previous span id)
//! ```
//!
//! # Example
//!
//! ```rust
//! use loadtest_generator::SpanGenerator;
//! use span_record::ROOT_PARENT_SPAN_ID;
//!
//! let mut generator = SpanGenerator::new(42);
//! let spans: Vec<_> = generator.trace(3).collect();
//!
//! assert_eq!(spans[0].span.parent_span_id, ROOT_PARENT_SPAN_ID);
//! assert_eq!(spans[1].span.parent_span_id, spans[0].key.item_id);
//! assert_eq!(spans[2].span.parent_span_id, spans[1].key.item_id);
//! ```
//!
//! # Generators
//!
//! - `hex` - Random lowercase hex identifiers (trace ids, span ids, hashes)
//! - `attributes` - Database-client span, resource and scope attribute sets
//! - `timestamp` - Start time and latency
//! - `uuid` - Workload ids

pub mod generator;
pub mod generators;

// Re-exports for convenience
pub use generator::{GeneratedSpan, SpanGenerator, TraceIterator, SPAN_ID_LEN, TRACE_ID_LEN};
