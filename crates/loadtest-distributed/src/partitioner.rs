//! Splitting a requested trace count across replicas.

/// Per-replica count used when a request carries no usable count.
pub const DEFAULT_PER_REPLICA: u64 = 2;

/// How much work a fan-out request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkCount {
    /// Split across all replicas.
    Total(u64),
    /// Sent to every replica verbatim.
    PerReplica(u64),
}

impl WorkCount {
    /// Resolve request parameters: a non-zero per-replica count wins, then a
    /// non-zero total, otherwise [`DEFAULT_PER_REPLICA`].
    pub fn from_params(per_replica: Option<u64>, total: Option<u64>) -> Self {
        match (per_replica.filter(|n| *n > 0), total.filter(|n| *n > 0)) {
            (Some(n), _) => Self::PerReplica(n),
            (None, Some(n)) => Self::Total(n),
            (None, None) => Self::PerReplica(DEFAULT_PER_REPLICA),
        }
    }

    /// Count each of `replicas` replicas is asked to generate.
    pub fn per_replica(self, replicas: usize) -> u64 {
        match self {
            Self::PerReplica(n) => n,
            Self::Total(total) => per_replica_count(total, replicas),
        }
    }
}

/// Integer division of `total` over `replicas`. The remainder is dropped;
/// zero replicas count as one.
pub fn per_replica_count(total: u64, replicas: usize) -> u64 {
    total / replicas.max(1) as u64
}

/// Describe the split for logging.
pub fn describe_split(total: u64, replicas: usize) -> String {
    let per_replica = per_replica_count(total, replicas);
    let dropped = total - per_replica * replicas.max(1) as u64;
    format!("{total} traces over {replicas} replicas: {per_replica} each, {dropped} dropped")
}
