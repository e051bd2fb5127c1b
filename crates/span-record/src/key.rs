//! Composite storage keys.

use crate::error::RecordError;
use std::fmt;

/// Separator placed between the group id and the item id.
pub const KEY_DELIMITER: &str = "-";

/// Identifier pair of one span: the trace it belongs to and its own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpanKey {
    pub group_id: String,
    pub item_id: String,
}

impl SpanKey {
    pub fn new(group_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            item_id: item_id.into(),
        }
    }

    /// The key under which the span is persisted.
    pub fn storage_key(&self) -> String {
        storage_key(&self.group_id, &self.item_id)
    }

    /// Split a persisted key back into its identifier pair.
    ///
    /// Group ids never contain the delimiter, so the split happens at the
    /// first occurrence.
    pub fn parse(key: &str) -> Result<Self, RecordError> {
        match key.split_once(KEY_DELIMITER) {
            Some((group, item)) if !group.is_empty() && !item.is_empty() => {
                Ok(Self::new(group, item))
            }
            _ => Err(RecordError::MalformedKey(key.to_string())),
        }
    }
}

impl fmt::Display for SpanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.group_id, KEY_DELIMITER, self.item_id)
    }
}

/// Build a storage key without allocating an intermediate [`SpanKey`].
pub fn storage_key(group_id: &str, item_id: &str) -> String {
    let mut key = String::with_capacity(group_id.len() + KEY_DELIMITER.len() + item_id.len());
    key.push_str(group_id);
    key.push_str(KEY_DELIMITER);
    key.push_str(item_id);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_joins_with_delimiter() {
        let key = SpanKey::new("abc", "123");
        assert_eq!(key.storage_key(), "abc-123");
        assert_eq!(key.to_string(), "abc-123");
        assert_eq!(storage_key("abc", "123"), "abc-123");
    }

    #[test]
    fn test_parse_roundtrip() {
        let key = SpanKey::new("4bf92f3577b34da6", "00f067aa0ba902b7");
        let parsed = SpanKey::parse(&key.storage_key()).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        assert!(SpanKey::parse("nodelimiter").is_err());
        assert!(SpanKey::parse("-item").is_err());
        assert!(SpanKey::parse("group-").is_err());
    }
}
