//! Pending-write buffer with the count/time flush policy.

use crate::store::PendingWrite;
use std::time::{Duration, Instant};

/// Buffered writes plus the time of the last successful flush.
///
/// The pending count is the buffer length. It only grows through
/// [`WriteBuffer::push`] and only shrinks through [`WriteBuffer::drain`].
#[derive(Debug)]
pub struct WriteBuffer {
    entries: Vec<PendingWrite>,
    last_flush: Instant,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            last_flush: Instant::now(),
        }
    }

    /// Append a write and return the new pending count.
    pub fn push(&mut self, entry: PendingWrite) -> usize {
        self.entries.push(entry);
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PendingWrite] {
        &self.entries
    }

    /// Time since the last successful flush (or since creation).
    pub fn since_last_flush(&self) -> Duration {
        self.last_flush.elapsed()
    }

    /// Whether the buffer is due: more than `batch_size` entries, or any
    /// entries and at least `interval` since the last flush.
    pub fn is_due(&self, batch_size: usize, interval: Duration) -> bool {
        let pending = self.entries.len();
        pending > batch_size || (pending > 0 && self.since_last_flush() >= interval)
    }

    /// Remove exactly the first `count` entries after they were committed
    /// and restart the flush clock.
    pub fn drain(&mut self, count: usize) {
        let count = count.min(self.entries.len());
        self.entries.drain(..count);
        self.last_flush = Instant::now();
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(key: &str) -> PendingWrite {
        PendingWrite::new(key.to_string(), b"{}".to_vec(), None)
    }

    #[test]
    fn test_push_counts_pending() {
        let mut buffer = WriteBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.push(write("a-1")), 1);
        assert_eq!(buffer.push(write("a-2")), 2);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_due_by_count() {
        let mut buffer = WriteBuffer::new();
        for i in 0..3 {
            buffer.push(write(&format!("a-{i}")));
        }
        assert!(!buffer.is_due(3, Duration::from_secs(3600)));
        buffer.push(write("a-3"));
        assert!(buffer.is_due(3, Duration::from_secs(3600)));
    }

    #[test]
    fn test_due_by_time_only_when_non_empty() {
        let mut buffer = WriteBuffer::new();
        assert!(!buffer.is_due(100, Duration::ZERO));
        buffer.push(write("a-1"));
        assert!(buffer.is_due(100, Duration::ZERO));
    }

    #[test]
    fn test_drain_keeps_later_entries() {
        let mut buffer = WriteBuffer::new();
        buffer.push(write("a-1"));
        buffer.push(write("a-2"));
        buffer.push(write("a-3"));

        buffer.drain(2);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.entries()[0].key, "a-3");

        buffer.drain(10);
        assert!(buffer.is_empty());
    }
}
