//! Main generator for producing trace-shaped spans.

use crate::generators::attributes::{db_client_attributes, resource_attributes};
use crate::generators::hex::generate_hex;
use crate::generators::timestamp::{generate_latency_ns, generate_start_ns};
use crate::generators::uuid::generate_workload_id;
use rand::rngs::StdRng;
use rand::SeedableRng;
use span_record::{
    ErrorType, Protocol, Span, SpanErrorInfo, SpanKey, SpanKind, ROOT_PARENT_SPAN_ID,
};

/// Length of a generated trace (group) id in hex characters.
pub const TRACE_ID_LEN: usize = 32;

/// Length of a generated span (item) id in hex characters.
pub const SPAN_ID_LEN: usize = 16;

const SERVICE_NAME: &str = "zk-db-test";
const SPAN_NAME: &str = "test-span";
const SOURCE: &str = "ingress-nginx-controller-7d884d97b5";
const SOURCE_IP: &str = "10.60.1.19";
const DESTINATION_IP: &str = "10.60.0.53";
const ERROR_HASH: &str = "6995586f1dc5c1002c21d359cd81052cf103925063135bb237ba6950b1161623";

/// One generated span together with the key it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSpan {
    pub key: SpanKey,
    pub span: Span,
}

/// Span generator that produces deterministic identifiers and payloads.
///
/// The generator uses a seeded random number generator so two generators
/// built with the same seed yield the same id sequence. Start timestamps come
/// from the wall clock and are the only non-reproducible field.
pub struct SpanGenerator {
    rng: StdRng,
    /// Number of spans generated so far
    index: u64,
}

impl SpanGenerator {
    /// Create a new generator with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            index: 0,
        }
    }

    /// Create a generator seeded from the operating system.
    ///
    /// Used for request-triggered runs so concurrent runs on the same replica
    /// (or across replicas) do not produce colliding keys.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            index: 0,
        }
    }

    /// Number of spans generated so far.
    pub fn current_index(&self) -> u64 {
        self.index
    }

    /// Fresh trace id: 32 lowercase hex characters.
    pub fn next_group_id(&mut self) -> String {
        generate_hex(&mut self.rng, TRACE_ID_LEN)
    }

    /// Fresh span id: 16 lowercase hex characters.
    pub fn next_item_id(&mut self) -> String {
        generate_hex(&mut self.rng, SPAN_ID_LEN)
    }

    /// Build one span payload with the given parent reference.
    ///
    /// An empty `parent_span_id` yields a root span.
    pub fn span(&mut self, parent_span_id: &str) -> Span {
        let mut span = Span::new(SpanKind::Server, SERVICE_NAME, SPAN_NAME, parent_span_id);
        span.start_ns = generate_start_ns();
        span.latency_ns = generate_latency_ns(&mut self.rng);
        span.protocol = Protocol::Http;
        span.source = Some(SOURCE.to_string());
        span.source_ip = Some(SOURCE_IP.to_string());
        span.dest_ip = Some(DESTINATION_IP.to_string());
        span.attributes = db_client_attributes(&mut self.rng);
        span.resource_attributes = resource_attributes();
        span.errors.push(SpanErrorInfo {
            message: "item not in stock".to_string(),
            error_type: ErrorType::Exception,
            exception_type: "java.lang.IllegalArgumentException".to_string(),
            hash: ERROR_HASH.to_string(),
        });
        span.workload_id_list
            .push(generate_workload_id(&mut self.rng));

        self.index += 1;
        span
    }

    /// Generate one trace of `spans_per_trace` spans under a fresh trace id.
    ///
    /// Returns an iterator that lazily generates spans. The first span is the
    /// root; every later span's parent is the previous span's id.
    pub fn trace(&mut self, spans_per_trace: u64) -> TraceIterator<'_> {
        let group_id = self.next_group_id();
        TraceIterator {
            generator: self,
            group_id,
            parent_span_id: ROOT_PARENT_SPAN_ID.to_string(),
            remaining: spans_per_trace,
        }
    }
}

/// Iterator over the spans of one trace.
pub struct TraceIterator<'a> {
    generator: &'a mut SpanGenerator,
    group_id: String,
    parent_span_id: String,
    remaining: u64,
}

impl TraceIterator<'_> {
    /// Trace id shared by every span of this iterator.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }
}

impl Iterator for TraceIterator<'_> {
    type Item = GeneratedSpan;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let item_id = self.generator.next_item_id();
        let span = self.generator.span(&self.parent_span_id);
        self.parent_span_id.clone_from(&item_id);

        Some(GeneratedSpan {
            key: SpanKey::new(self.group_id.clone(), item_id),
            span,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TraceIterator<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_have_expected_shape() {
        let mut generator = SpanGenerator::new(42);
        let group = generator.next_group_id();
        let item = generator.next_item_id();

        assert_eq!(group.len(), TRACE_ID_LEN);
        assert_eq!(item.len(), SPAN_ID_LEN);
        assert!(group.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_deterministic_ids() {
        let mut gen1 = SpanGenerator::new(42);
        let mut gen2 = SpanGenerator::new(42);

        let keys1: Vec<_> = gen1.trace(5).map(|s| s.key).collect();
        let keys2: Vec<_> = gen2.trace(5).map(|s| s.key).collect();
        assert_eq!(keys1, keys2);

        let mut gen3 = SpanGenerator::new(43);
        let keys3: Vec<_> = gen3.trace(5).map(|s| s.key).collect();
        assert_ne!(keys1, keys3);
    }

    #[test]
    fn test_trace_chains_parents() {
        let mut generator = SpanGenerator::new(7);
        let trace = generator.trace(10);
        assert_eq!(trace.len(), 10);
        let group_id = trace.group_id().to_string();
        let spans: Vec<_> = trace.collect();

        assert_eq!(spans.len(), 10);
        assert!(spans[0].span.is_root());
        for pair in spans.windows(2) {
            assert_eq!(pair[1].span.parent_span_id, pair[0].key.item_id);
        }
        assert!(spans.iter().all(|s| s.key.group_id == group_id));
        assert_eq!(generator.current_index(), 10);
    }

    #[test]
    fn test_each_trace_gets_fresh_group() {
        let mut generator = SpanGenerator::new(7);
        let first = generator.trace(1).next().unwrap();
        let second = generator.trace(1).next().unwrap();

        assert_ne!(first.key.group_id, second.key.group_id);
        assert!(second.span.is_root());
    }

    #[test]
    fn test_empty_trace() {
        let mut generator = SpanGenerator::new(7);
        assert_eq!(generator.trace(0).count(), 0);
        assert_eq!(generator.current_index(), 0);
    }

    #[test]
    fn test_span_payload_defaults() {
        let mut generator = SpanGenerator::new(1);
        let span = generator.span("");

        assert!(span.is_root());
        assert_eq!(span.span_kind, SpanKind::Server);
        assert_eq!(span.service_name, "zk-db-test");
        assert_eq!(span.protocol, Protocol::Http);
        assert_eq!(span.resource_ip(), DESTINATION_IP);
        assert_eq!(span.errors.len(), 1);
        assert_eq!(span.workload_id_list.len(), 1);
        assert!(span.latency_ns > 0);
    }
}
