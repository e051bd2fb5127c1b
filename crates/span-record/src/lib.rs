//! Record model for the kv-loadtest framework.
//!
//! Every synthetic write issued by the load generators is one [`Span`]: a
//! trace/span-shaped payload with three independent attribute namespaces
//! (item, scope and resource), a parent reference, timing information and a
//! kind tag. Spans are addressed in storage by a [`SpanKey`], the
//! `(trace id, span id)` pair joined with [`KEY_DELIMITER`].
//!
//! ```text
//!  SpanKey { group_id: "4bf9…", item_id: "00f0…" }
//!        │
//!        ▼
//!  storage key  "4bf9…-00f0…"   ──►  value = serde_json(Span)
//! ```
//!
//! # Example
//!
//! ```rust
//! use span_record::{Span, SpanKey, SpanKind, ROOT_PARENT_SPAN_ID};
//!
//! let span = Span::new(SpanKind::Server, "checkout", "GET /cart", "");
//! assert_eq!(span.parent_span_id, ROOT_PARENT_SPAN_ID);
//!
//! let key = SpanKey::new("4bf92f3577b34da6a3ce929d0e0e4736", "00f067aa0ba902b7");
//! assert_eq!(key.storage_key(), "4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7");
//! ```

pub mod error;
pub mod key;
pub mod span;

pub use error::RecordError;
pub use key::{storage_key, SpanKey, KEY_DELIMITER};
pub use span::{
    AttributeMap, ErrorType, GroupByMap, GroupByValue, Protocol, Span, SpanErrorInfo, SpanKind,
    ROOT_PARENT_SPAN_ID, SCHEMA_VERSION,
};
