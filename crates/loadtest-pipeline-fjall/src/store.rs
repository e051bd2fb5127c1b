//! fjall keyspace handle, bulk commits, reads and maintenance.

use crate::args::FjallConfig;
use crate::envelope::{self, Envelope};
use crate::error::{FjallPipelineError, Stage};
use crate::FJALL_BACKEND;
use fjall::{
    GarbageCollection, Keyspace, KvSeparationOptions, PartitionCreateOptions, PartitionHandle,
    PersistMode,
};
use loadtest_pipeline::{
    BulkStore, CompactionReport, EntryReader, GcReport, Maintenance, PendingWrite, PipelineError,
};
use tracing::{debug, info};

/// Name of the partition holding all spans.
pub const SPANS_PARTITION: &str = "spans";

/// Keyspace plus the spans partition. Cheap to clone.
#[derive(Clone)]
pub struct FjallHandle {
    keyspace: Keyspace,
    partition: PartitionHandle,
    gc_space_amp_target: f32,
}

impl FjallHandle {
    /// Open (or create) the keyspace at `config.path`.
    pub fn open(config: &FjallConfig) -> Result<Self, FjallPipelineError> {
        let keyspace = fjall::Config::new(&config.path).open()?;
        let partition = keyspace.open_partition(
            SPANS_PARTITION,
            PartitionCreateOptions::default().with_kv_separation(KvSeparationOptions::default()),
        )?;
        info!(path = %config.path.display(), "Opened fjall keyspace");
        Ok(Self {
            keyspace,
            partition,
            gc_space_amp_target: config.gc_space_amp_target,
        })
    }

    pub fn disk_space(&self) -> u64 {
        self.partition.disk_space()
    }

    /// Persist the journal and fsync it.
    pub async fn sync_all(&self) -> Result<(), PipelineError> {
        self.blocking(Stage::Close, |h| {
            h.keyspace.persist(PersistMode::SyncAll)?;
            Ok(())
        })
        .await
    }

    /// Run `f` on the blocking pool with a clone of this handle.
    async fn blocking<T, F>(&self, stage: Stage, f: F) -> Result<T, PipelineError>
    where
        T: Send + 'static,
        F: FnOnce(FjallHandle) -> Result<T, FjallPipelineError> + Send + 'static,
    {
        let handle = self.clone();
        tokio::task::spawn_blocking(move || f(handle))
            .await
            .map_err(|e| FjallPipelineError::from(e).into_pipeline(stage))?
            .map_err(|e| e.into_pipeline(stage))
    }

    fn write_batch(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), FjallPipelineError> {
        let mut batch = self.keyspace.batch();
        for (key, value) in entries {
            batch.insert(&self.partition, key, value);
        }
        batch.commit()?;
        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(())
    }

    fn get_live(&self, key: &str, now_ms: u64) -> Result<Option<Vec<u8>>, FjallPipelineError> {
        let Some(stored) = self.partition.get(key)? else {
            return Ok(None);
        };
        let envelope = Envelope::decode(key.as_bytes(), &stored)?;
        if envelope.is_expired(now_ms) {
            return Ok(None);
        }
        Ok(Some(envelope.payload.to_vec()))
    }

    fn first_live(&self, now_ms: u64) -> Result<Option<(String, Vec<u8>)>, FjallPipelineError> {
        for item in self.partition.iter() {
            let (key, stored) = item?;
            let envelope = Envelope::decode(&key, &stored)?;
            if !envelope.is_expired(now_ms) {
                let key = String::from_utf8_lossy(&key).into_owned();
                return Ok(Some((key, envelope.payload.to_vec())));
            }
        }
        Ok(None)
    }

    fn count_live(&self, now_ms: u64) -> Result<u64, FjallPipelineError> {
        let mut live = 0;
        for item in self.partition.iter() {
            let (key, stored) = item?;
            if !Envelope::decode(&key, &stored)?.is_expired(now_ms) {
                live += 1;
            }
        }
        Ok(live)
    }

    /// Delete every expired key in one batch.
    fn sweep_expired(&self, now_ms: u64) -> Result<u64, FjallPipelineError> {
        let mut expired = Vec::new();
        for item in self.partition.iter() {
            let (key, stored) = item?;
            if Envelope::decode(&key, &stored)?.is_expired(now_ms) {
                expired.push(key);
            }
        }
        if expired.is_empty() {
            return Ok(0);
        }

        let removed = expired.len() as u64;
        let mut batch = self.keyspace.batch();
        for key in expired {
            batch.remove(&self.partition, key);
        }
        batch.commit()?;
        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(removed)
    }

    fn collect_garbage(&self) -> Result<GcReport, FjallPipelineError> {
        let expired_removed = self.sweep_expired(envelope::now_ms())?;
        self.partition.gc_scan()?;
        let bytes_reclaimed = self
            .partition
            .gc_with_space_amp_target(self.gc_space_amp_target)?;
        Ok(GcReport {
            expired_removed,
            bytes_reclaimed,
        })
    }

    fn compact_levels(&self, levels: usize) -> Result<CompactionReport, FjallPipelineError> {
        if levels == 0 {
            return Err(FjallPipelineError::InvalidCompactionLevels);
        }
        let disk_space_before = self.partition.disk_space();
        let mut previous = disk_space_before;
        let mut passes = 0;

        while passes < levels {
            self.partition.major_compact()?;
            passes += 1;
            let current = self.partition.disk_space();
            if current >= previous {
                break;
            }
            previous = current;
        }

        Ok(CompactionReport {
            passes,
            disk_space_before,
            disk_space_after: self.partition.disk_space(),
        })
    }
}

#[async_trait::async_trait]
impl EntryReader for FjallHandle {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PipelineError> {
        let key = key.to_string();
        self.blocking(Stage::Read, move |h| h.get_live(&key, envelope::now_ms()))
            .await
    }

    async fn first_entry(&self) -> Result<Option<(String, Vec<u8>)>, PipelineError> {
        self.blocking(Stage::Read, |h| h.first_live(envelope::now_ms()))
            .await
    }

    async fn count(&self) -> Result<u64, PipelineError> {
        self.blocking(Stage::Read, |h| h.count_live(envelope::now_ms()))
            .await
    }
}

#[async_trait::async_trait]
impl Maintenance for FjallHandle {
    async fn run_garbage_collection(&self) -> Result<GcReport, PipelineError> {
        let report = self
            .blocking(Stage::Maintenance, |h| h.collect_garbage())
            .await?;
        if report.bytes_reclaimed == 0 && report.expired_removed == 0 {
            debug!("Garbage collection found nothing to reclaim");
        } else {
            info!(
                expired_removed = report.expired_removed,
                bytes_reclaimed = report.bytes_reclaimed,
                "Garbage collection finished"
            );
        }
        Ok(report)
    }

    async fn compact(&self, levels: usize) -> Result<CompactionReport, PipelineError> {
        let report = self
            .blocking(Stage::Maintenance, move |h| h.compact_levels(levels))
            .await?;
        info!(
            passes = report.passes,
            before = report.disk_space_before,
            after = report.disk_space_after,
            "Compaction finished"
        );
        Ok(report)
    }
}

/// [`BulkStore`] committing each flush as one atomic fjall batch.
pub struct FjallStore {
    handle: FjallHandle,
    closed: bool,
}

impl FjallStore {
    pub fn new(handle: FjallHandle) -> Self {
        Self {
            handle,
            closed: false,
        }
    }

    pub fn handle(&self) -> &FjallHandle {
        &self.handle
    }
}

#[async_trait::async_trait]
impl BulkStore for FjallStore {
    fn backend(&self) -> &str {
        FJALL_BACKEND
    }

    async fn commit(&mut self, batch: &[PendingWrite]) -> Result<(), PipelineError> {
        let entries: Vec<(String, Vec<u8>)> = batch
            .iter()
            .map(|write| {
                let expiry = envelope::expiry_ms(write.expires_at());
                (write.key.clone(), envelope::encode(expiry, &write.value))
            })
            .collect();
        self.handle
            .blocking(Stage::Flush, move |h| h.write_batch(entries))
            .await
    }

    async fn close(&mut self) -> Result<(), PipelineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.handle.sync_all().await?;
        debug!("Persisted fjall journal on close");
        Ok(())
    }
}
