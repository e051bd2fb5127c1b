//! Redis connection handling, pipelined bulk commits and reads.

use crate::args::RedisConfig;
use crate::error::RedisPipelineError;
use crate::REDIS_BACKEND;
use loadtest_pipeline::{BulkStore, EntryReader, PendingWrite, PipelineError};
use redis::aio::MultiplexedConnection;
use redis::{Client, FromRedisValue};
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 1000;

async fn connect(client: &Client) -> Result<MultiplexedConnection, RedisPipelineError> {
    Ok(client.get_multiplexed_async_connection().await?)
}

async fn ping(conn: &mut MultiplexedConnection) -> Result<(), RedisPipelineError> {
    let reply: String = redis::cmd("PING").query_async(conn).await?;
    if reply != "PONG" {
        return Err(RedisPipelineError::UnexpectedPing(reply));
    }
    Ok(())
}

/// [`BulkStore`] committing each flush as one `MULTI`/`EXEC` pipeline.
///
/// The connection is probed with `PING` when the last successful probe is
/// older than the probe interval or the previous operation failed. A failed
/// probe drops and re-creates the connection once before giving up.
pub struct RedisStore {
    config: RedisConfig,
    client: Client,
    conn: Option<MultiplexedConnection>,
    last_probe: Option<Instant>,
    last_failed: bool,
}

impl RedisStore {
    /// Connect to the server and verify it answers `PING`.
    pub async fn connect(config: RedisConfig) -> Result<Self, RedisPipelineError> {
        let client = Client::open(config.url.as_str())?;
        let mut conn = connect(&client).await?;
        ping(&mut conn).await?;
        info!(url = %config.display_url(), "Connected to Redis");

        Ok(Self {
            config,
            client,
            conn: Some(conn),
            last_probe: Some(Instant::now()),
            last_failed: false,
        })
    }

    fn probe_due(&self) -> bool {
        self.last_failed
            || self
                .last_probe
                .is_none_or(|at| at.elapsed() >= self.config.probe_interval)
    }

    /// Probe the connection, re-creating it once when the probe fails.
    pub async fn check_connection(&mut self) -> Result<(), RedisPipelineError> {
        if let Some(conn) = self.conn.as_mut() {
            match ping(conn).await {
                Ok(()) => {
                    self.mark_healthy();
                    return Ok(());
                }
                Err(e) => warn!(
                    url = %self.config.display_url(),
                    "Redis probe failed, reconnecting: {e}"
                ),
            }
        }

        self.conn = None;
        let result = self.reconnect().await;
        match &result {
            Ok(()) => self.mark_healthy(),
            Err(_) => self.last_failed = true,
        }
        result
    }

    async fn reconnect(&mut self) -> Result<(), RedisPipelineError> {
        let mut conn = connect(&self.client).await?;
        ping(&mut conn).await?;
        self.conn = Some(conn);
        info!(url = %self.config.display_url(), "Reconnected to Redis");
        Ok(())
    }

    fn mark_healthy(&mut self) {
        self.last_probe = Some(Instant::now());
        self.last_failed = false;
    }

    fn build_pipeline(batch: &[PendingWrite]) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for write in batch {
            pipe.cmd("SET").arg(&write.key).arg(write.value.as_slice());
            if let Some(ttl) = write.ttl.filter(|ttl| !ttl.is_zero()) {
                pipe.arg("EX").arg(ttl.as_secs().max(1));
            }
            pipe.ignore();
        }
        pipe
    }

    async fn exec(&mut self, pipe: &redis::Pipeline) -> Result<(), RedisPipelineError> {
        if self.conn.is_none() {
            self.reconnect().await?;
        }
        let Some(conn) = self.conn.as_mut() else {
            return Err(RedisPipelineError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "no connection",
            ))));
        };
        let _: () = pipe.query_async(conn).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl BulkStore for RedisStore {
    fn backend(&self) -> &str {
        REDIS_BACKEND
    }

    async fn ensure_ready(&mut self) -> Result<(), PipelineError> {
        if self.conn.is_some() && !self.probe_due() {
            return Ok(());
        }
        self.check_connection().await.map_err(PipelineError::from)
    }

    async fn commit(&mut self, batch: &[PendingWrite]) -> Result<(), PipelineError> {
        let pipe = Self::build_pipeline(batch);

        let result = match self.exec(&pipe).await {
            Err(e) if e.is_connection_error() => {
                warn!(entries = batch.len(), "Bulk commit lost its connection, retrying once: {e}");
                self.conn = None;
                self.exec(&pipe).await
            }
            other => other,
        };

        match result {
            Ok(()) => {
                self.mark_healthy();
                debug!(entries = batch.len(), "Committed pipeline to Redis");
                Ok(())
            }
            Err(e) => {
                self.last_failed = true;
                Err(PipelineError::flush(REDIS_BACKEND, e))
            }
        }
    }

    async fn close(&mut self) -> Result<(), PipelineError> {
        if self.conn.take().is_some() {
            debug!(url = %self.config.display_url(), "Closed Redis connection");
        }
        Ok(())
    }
}

/// Read access over a dedicated connection.
///
/// A read that fails because the connection is unusable re-creates the
/// connection once and retries.
pub struct RedisReader {
    config: RedisConfig,
    client: Client,
    conn: RwLock<MultiplexedConnection>,
}

impl RedisReader {
    pub async fn connect(config: &RedisConfig) -> Result<Self, RedisPipelineError> {
        let client = Client::open(config.url.as_str())?;
        let conn = connect(&client).await?;
        Ok(Self {
            config: config.clone(),
            client,
            conn: RwLock::new(conn),
        })
    }

    async fn reconnect(&self) -> Result<MultiplexedConnection, RedisPipelineError> {
        let mut conn = connect(&self.client).await?;
        ping(&mut conn).await?;
        *self.conn.write().await = conn.clone();
        info!(url = %self.config.display_url(), "Reconnected Redis reader");
        Ok(conn)
    }

    async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T, PipelineError> {
        let mut conn = self.conn.read().await.clone();
        let result = match cmd.query_async(&mut conn).await.map_err(RedisPipelineError::from) {
            Err(e) if e.is_connection_error() => {
                warn!(
                    url = %self.config.display_url(),
                    "Redis read lost its connection, retrying once: {e}"
                );
                match self.reconnect().await {
                    Ok(mut conn) => cmd
                        .query_async(&mut conn)
                        .await
                        .map_err(RedisPipelineError::from),
                    Err(e) => Err(e),
                }
            }
            other => other,
        };
        result.map_err(|e| PipelineError::read(REDIS_BACKEND, e))
    }

    /// Server-side id of the current read connection.
    pub async fn client_id(&self) -> Result<u64, PipelineError> {
        let mut cmd = redis::cmd("CLIENT");
        cmd.arg("ID");
        self.query(&cmd).await
    }

    async fn scan_page(&self, cursor: u64) -> Result<(u64, Vec<String>), PipelineError> {
        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor).arg("COUNT").arg(SCAN_BATCH);
        self.query(&cmd).await
    }
}

#[async_trait::async_trait]
impl EntryReader for RedisReader {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PipelineError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query(&cmd).await
    }
    async fn first_entry(&self) -> Result<Option<(String, Vec<u8>)>, PipelineError> {
        let mut cursor = 0;
        loop {
            let (next, keys) = self.scan_page(cursor).await?;
            for key in keys {
                // The key may expire between SCAN and GET.
                if let Some(value) = self.get(&key).await? {
                    return Ok(Some((key, value)));
                }
            }
            if next == 0 {
                return Ok(None);
            }
            cursor = next;
        }
    }

    async fn count(&self) -> Result<u64, PipelineError> {
        let mut cursor = 0;
        let mut total = 0u64;
        loop {
            let (next, keys) = self.scan_page(cursor).await?;
            total += keys.len() as u64;
            if next == 0 {
                return Ok(total);
            }
            cursor = next;
        }
    }
}
