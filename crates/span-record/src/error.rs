//! Error types for the record model.

use thiserror::Error;

/// Errors raised while encoding, decoding or addressing a span.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The span could not be serialized.
    #[error("failed to encode span: {0}")]
    Encode(#[source] serde_json::Error),

    /// Stored bytes are not a valid span.
    #[error("failed to decode span: {0}")]
    Decode(#[source] serde_json::Error),

    /// A storage key without the group/item delimiter.
    #[error("malformed storage key: {0}")]
    MalformedKey(String),
}
