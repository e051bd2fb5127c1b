//! In-process backend used for dry runs and tests.

use crate::error::PipelineError;
use crate::maintenance::EntryReader;
use crate::store::{BulkStore, PendingWrite};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;
use tracing::debug;

pub const MEMORY_BACKEND: &str = "memory";

#[derive(Debug, Clone)]
struct StoredValue {
    value: Vec<u8>,
    expires_at: Option<SystemTime>,
}

impl StoredValue {
    fn is_live(&self, now: SystemTime) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Default)]
struct Shared {
    entries: Mutex<BTreeMap<String, StoredValue>>,
    fail_commits: AtomicBool,
    commits: AtomicU64,
    closes: AtomicU64,
}

impl Shared {
    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, StoredValue>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Store keeping committed entries in a shared ordered map.
///
/// Clones share the same map, so a clone kept outside the pipeline serves as
/// the [`EntryReader`] and as a test probe.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent commits fail until switched off again.
    pub fn set_fail_commits(&self, fail: bool) {
        self.shared.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of successful bulk commits.
    pub fn commit_count(&self) -> u64 {
        self.shared.commits.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> u64 {
        self.shared.closes.load(Ordering::SeqCst)
    }

    /// All stored keys, including expired ones.
    pub fn keys(&self) -> Vec<String> {
        self.shared.entries().keys().cloned().collect()
    }
}

#[async_trait::async_trait]
impl BulkStore for MemoryStore {
    fn backend(&self) -> &str {
        MEMORY_BACKEND
    }

    async fn commit(&mut self, batch: &[PendingWrite]) -> Result<(), PipelineError> {
        if self.shared.fail_commits.load(Ordering::SeqCst) {
            return Err(PipelineError::flush(MEMORY_BACKEND, "commit failure injected"));
        }

        let mut entries = self.shared.entries();
        for write in batch {
            entries.insert(
                write.key.clone(),
                StoredValue {
                    value: write.value.clone(),
                    expires_at: write.expires_at(),
                },
            );
        }
        self.shared.commits.fetch_add(1, Ordering::SeqCst);
        debug!(entries = batch.len(), "Committed batch to memory store");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PipelineError> {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait::async_trait]
impl EntryReader for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PipelineError> {
        let now = SystemTime::now();
        Ok(self
            .shared
            .entries()
            .get(key)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.value.clone()))
    }

    async fn first_entry(&self) -> Result<Option<(String, Vec<u8>)>, PipelineError> {
        let now = SystemTime::now();
        Ok(self
            .shared
            .entries()
            .iter()
            .find(|(_, stored)| stored.is_live(now))
            .map(|(key, stored)| (key.clone(), stored.value.clone())))
    }

    async fn count(&self) -> Result<u64, PipelineError> {
        let now = SystemTime::now();
        let live = self
            .shared
            .entries()
            .values()
            .filter(|stored| stored.is_live(now))
            .count();
        Ok(live as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write(key: &str, ttl: Option<Duration>) -> PendingWrite {
        PendingWrite::new(key.to_string(), key.as_bytes().to_vec(), ttl)
    }

    #[tokio::test]
    async fn test_commit_and_read() {
        let mut store = MemoryStore::new();
        let reader = store.clone();
        store
            .commit(&[write("a-1", None), write("a-2", None)])
            .await
            .unwrap();

        assert_eq!(reader.count().await.unwrap(), 2);
        assert_eq!(reader.get("a-2").await.unwrap(), Some(b"a-2".to_vec()));
        assert_eq!(reader.get("missing").await.unwrap(), None);
        assert_eq!(
            reader.first_entry().await.unwrap(),
            Some(("a-1".to_string(), b"a-1".to_vec()))
        );
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_hidden() {
        let mut store = MemoryStore::new();
        let mut expired = write("a-1", Some(Duration::from_secs(1)));
        expired.written_at = SystemTime::now() - Duration::from_secs(10);
        store
            .commit(&[expired, write("a-2", Some(Duration::from_secs(60)))])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get("a-1").await.unwrap(), None);
        assert_eq!(store.keys().len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let mut store = MemoryStore::new();
        store.set_fail_commits(true);
        assert!(store.commit(&[write("a-1", None)]).await.is_err());
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
