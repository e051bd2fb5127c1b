//! Individual value generators for the parts of a span.

pub mod attributes;
pub mod hex;
pub mod timestamp;
pub mod uuid;
