//! Expiry framing of stored values.
//!
//! fjall has no per-key TTL, so each value is prefixed with its absolute
//! expiry: 8 bytes big-endian Unix milliseconds, `0` meaning never.

use crate::error::FjallPipelineError;
use std::time::{SystemTime, UNIX_EPOCH};

pub const HEADER_LEN: usize = 8;

/// Expiry value for entries that never expire.
pub const NEVER: u64 = 0;

/// A decoded value borrowing the stored bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub expires_at_ms: u64,
    pub payload: &'a [u8],
}

impl<'a> Envelope<'a> {
    pub fn decode(key: &[u8], bytes: &'a [u8]) -> Result<Self, FjallPipelineError> {
        if bytes.len() < HEADER_LEN {
            return Err(FjallPipelineError::CorruptEnvelope {
                key: String::from_utf8_lossy(key).into_owned(),
                len: bytes.len(),
            });
        }
        let (header, payload) = bytes.split_at(HEADER_LEN);
        let mut expiry = [0u8; HEADER_LEN];
        expiry.copy_from_slice(header);
        Ok(Self {
            expires_at_ms: u64::from_be_bytes(expiry),
            payload,
        })
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms != NEVER && self.expires_at_ms <= now_ms
    }
}

pub fn encode(expires_at_ms: u64, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&expires_at_ms.to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

/// Milliseconds since the Unix epoch, `0` for times before it.
pub fn unix_ms(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn now_ms() -> u64 {
    unix_ms(SystemTime::now())
}

/// Header value for an optional absolute expiry.
pub fn expiry_ms(expires_at: Option<SystemTime>) -> u64 {
    // An expiry at the epoch would read as "never"; clamp it to 1 ms.
    expires_at.map_or(NEVER, |at| unix_ms(at).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_decode_splits_header() {
        let bytes = encode(1_700_000_000_000, b"{\"a\":1}");
        let envelope = Envelope::decode(b"k", &bytes).unwrap();
        assert_eq!(envelope.expires_at_ms, 1_700_000_000_000);
        assert_eq!(envelope.payload, b"{\"a\":1}");
    }

    #[test]
    fn test_never_does_not_expire() {
        let bytes = encode(NEVER, b"x");
        let envelope = Envelope::decode(b"k", &bytes).unwrap();
        assert!(!envelope.is_expired(u64::MAX));
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let bytes = encode(1_000, b"x");
        let envelope = Envelope::decode(b"k", &bytes).unwrap();
        assert!(!envelope.is_expired(999));
        assert!(envelope.is_expired(1_000));
    }

    #[test]
    fn test_short_value_is_corrupt() {
        let result = Envelope::decode(b"a-1", b"abc");
        assert!(matches!(
            result,
            Err(FjallPipelineError::CorruptEnvelope { len: 3, .. })
        ));
    }

    #[test]
    fn test_expiry_ms() {
        assert_eq!(expiry_ms(None), NEVER);
        assert_eq!(expiry_ms(Some(UNIX_EPOCH)), 1);
        assert_eq!(
            expiry_ms(Some(UNIX_EPOCH + Duration::from_secs(2))),
            2_000
        );
    }
}
