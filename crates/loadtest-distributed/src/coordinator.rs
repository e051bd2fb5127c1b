//! Fan-out of one load request across all discovered replicas.

use crate::client::{PeerClient, DEFAULT_PEER_TIMEOUT};
use crate::error::DistributedError;
use crate::partitioner::{describe_split, WorkCount};
use crate::registry::{PeerEntry, ServiceRegistry};
use crate::report::{FanoutReport, PeerOutcome, PeerStatus};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_NAMESPACE: &str = "zk-loadtest";
pub const DEFAULT_LABEL_SELECTOR: &str = "app=zk-db-test";
pub const DEFAULT_PEER_PORT: u16 = 80;
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Where replicas live and how they are called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutConfig {
    pub namespace: String,
    pub label_selector: String,
    pub peer_port: u16,
    pub timeout: Duration,
    pub max_concurrency: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            label_selector: DEFAULT_LABEL_SELECTOR.to_string(),
            peer_port: DEFAULT_PEER_PORT,
            timeout: DEFAULT_PEER_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Discovers replicas and triggers each of them with its share of the work.
///
/// A registry error or an empty registry falls back to a single local
/// target. A failing replica is recorded in the report and never stops the
/// remaining calls.
pub struct FanoutCoordinator {
    registry: Arc<dyn ServiceRegistry>,
    client: Arc<dyn PeerClient>,
    config: FanoutConfig,
}

impl FanoutCoordinator {
    pub fn new(
        registry: Arc<dyn ServiceRegistry>,
        client: Arc<dyn PeerClient>,
        config: FanoutConfig,
    ) -> Self {
        Self {
            registry,
            client,
            config,
        }
    }

    pub fn config(&self) -> &FanoutConfig {
        &self.config
    }

    /// Replicas to contact, with the local fallback applied.
    async fn peers(&self) -> (Vec<PeerEntry>, bool) {
        let discovered = match self
            .registry
            .discover(&self.config.namespace, &self.config.label_selector)
            .await
        {
            Ok(peers) => peers,
            Err(e) => {
                warn!(
                    namespace = %self.config.namespace,
                    label_selector = %self.config.label_selector,
                    "Replica discovery failed, using local target: {e}"
                );
                Vec::new()
            }
        };

        let peers: Vec<PeerEntry> = discovered
            .into_iter()
            .filter(PeerEntry::is_complete)
            .collect();
        if peers.is_empty() {
            return (vec![PeerEntry::localhost()], true);
        }
        (peers, false)
    }

    fn peer_url(&self, peer: &PeerEntry, target_path: &str, per_replica: u64) -> String {
        format!(
            "http://{}:{}{}?traceCount={}",
            peer.address, self.config.peer_port, target_path, per_replica
        )
    }

    /// Trigger `target_path` on every replica.
    ///
    /// When the split leaves 0 traces per replica no replica is called and
    /// every line is reported as skipped.
    pub async fn distribute(&self, count: WorkCount, target_path: &str) -> FanoutReport {
        let (peers, local_fallback) = self.peers().await;
        let per_replica = count.per_replica(peers.len());
        match count {
            WorkCount::Total(total) => info!("Fan-out: {}", describe_split(total, peers.len())),
            WorkCount::PerReplica(n) => {
                info!("Fan-out: {n} traces to each of {} replicas", peers.len())
            }
        }

        if per_replica == 0 {
            warn!(
                replicas = peers.len(),
                "Share per replica is 0 traces, not triggering any replica"
            );
            let outcomes = peers
                .into_iter()
                .map(|peer| PeerOutcome {
                    url: self.peer_url(&peer, target_path, 0),
                    peer,
                    status: PeerStatus::Skipped,
                })
                .collect();
            return FanoutReport {
                per_replica,
                local_fallback,
                outcomes,
            };
        }

        let timeout = self.config.timeout;
        let calls = peers.into_iter().map(|peer| {
            let url = self.peer_url(&peer, target_path, per_replica);
            let client = self.client.clone();
            async move {
                let result = match tokio::time::timeout(timeout, client.trigger(&url)).await {
                    Ok(result) => result,
                    Err(_) => Err(DistributedError::Timeout(timeout)),
                };
                let status = match result {
                    Ok(body) => PeerStatus::Responded(body),
                    Err(e) => {
                        error!(peer = %peer.name, %url, "Peer call failed: {e}");
                        PeerStatus::Failed(e.to_string())
                    }
                };
                PeerOutcome { peer, url, status }
            }
        });

        // `buffered` keeps registry order regardless of completion order.
        let outcomes: Vec<PeerOutcome> = stream::iter(calls)
            .buffered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        FanoutReport {
            per_replica,
            local_fallback,
            outcomes,
        }
    }
}
