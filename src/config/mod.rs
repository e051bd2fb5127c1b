//! Effective configuration of a kv-loadtest process.
//!
//! Settings come from built-in defaults, optionally overlaid by a YAML file
//! and then by command-line flags or their environment variables (see
//! [`ConfigArgs`]).

pub mod args;
pub mod duration;

pub use args::ConfigArgs;
pub use duration::parse_duration;

use crate::orchestrator::FailurePolicy;
use anyhow::Context;
use loadtest_distributed::{
    FanoutConfig, PeerEntry, DEFAULT_LABEL_SELECTOR, DEFAULT_MAX_CONCURRENCY, DEFAULT_NAMESPACE,
    DEFAULT_PEER_PORT,
};
use loadtest_pipeline::{FlushPolicy, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL, DEFAULT_TTL};
use loadtest_pipeline_fjall::{FjallConfig, DEFAULT_GC_INTERVAL, DEFAULT_GC_SPACE_AMP_TARGET};
use loadtest_pipeline_redis::{RedisConfig, DEFAULT_PROBE_INTERVAL, DEFAULT_REDIS_URL};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
pub const DEFAULT_SPANS_PER_TRACE: u64 = 10;
pub const DEFAULT_COMPACTION_LEVELS: usize = 2;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerSection,
    pub traces: TracesSection,
    pub fjall: FjallSection,
    pub redis: RedisSection,
    pub fanout: FanoutSection,
    pub logs: LogsSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

/// Shape of generated load and the flush thresholds applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TracesSection {
    /// Milliseconds after which the driver flushes a non-empty buffer.
    pub sync_interval: u64,
    /// Pending count above which `put` flushes.
    pub sync_batch_size: usize,
    /// Entry time-to-live in seconds. Zero disables expiry.
    pub ttl: u64,
    pub spans_per_trace: u64,
    pub failure_policy: FailurePolicy,
    /// Fixed generator seed. Unset seeds every run from the OS.
    pub seed: Option<u64>,
}

impl Default for TracesSection {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_FLUSH_INTERVAL.as_millis() as u64,
            sync_batch_size: DEFAULT_BATCH_SIZE,
            ttl: DEFAULT_TTL.as_secs(),
            spans_per_trace: DEFAULT_SPANS_PER_TRACE,
            failure_policy: FailurePolicy::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FjallSection {
    pub enabled: bool,
    pub path: PathBuf,
    /// Seconds between garbage collection runs.
    pub gc_interval: u64,
    pub gc_space_amp_target: f32,
    /// Passes run by the compaction route.
    pub compaction_levels: usize,
}

impl Default for FjallSection {
    fn default() -> Self {
        let defaults = FjallConfig::default();
        Self {
            enabled: false,
            path: defaults.path,
            gc_interval: DEFAULT_GC_INTERVAL.as_secs(),
            gc_space_amp_target: DEFAULT_GC_SPACE_AMP_TARGET,
            compaction_levels: DEFAULT_COMPACTION_LEVELS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedisSection {
    pub enabled: bool,
    pub url: String,
    /// Milliseconds between connection health probes.
    pub probe_interval: u64,
}

impl Default for RedisSection {
    fn default() -> Self {
        Self {
            enabled: false,
            url: DEFAULT_REDIS_URL.to_string(),
            probe_interval: DEFAULT_PROBE_INTERVAL.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FanoutSection {
    pub namespace: String,
    pub label_selector: String,
    pub peer_port: u16,
    /// Per-call timeout, e.g. "30s".
    pub timeout: String,
    pub max_concurrency: usize,
    /// `name=address` entries. Empty uses Kubernetes discovery.
    pub static_peers: Vec<String>,
}

impl Default for FanoutSection {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            label_selector: DEFAULT_LABEL_SELECTOR.to_string(),
            peer_port: DEFAULT_PEER_PORT,
            timeout: "30s".to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            static_peers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogsSection {
    pub level: String,
}

impl Default for LogsSection {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse config file: {path:?}"))
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reject settings the pipelines and the coordinator cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.listen_addr()?;
        if self.traces.sync_batch_size == 0 {
            anyhow::bail!("traces.sync_batch_size must be positive");
        }
        if self.traces.sync_interval == 0 {
            anyhow::bail!("traces.sync_interval must be positive");
        }
        if self.fjall.gc_interval == 0 {
            anyhow::bail!("fjall.gc_interval must be positive");
        }
        if self.fjall.compaction_levels == 0 {
            anyhow::bail!("fjall.compaction_levels must be positive");
        }
        if self.fanout.max_concurrency == 0 {
            anyhow::bail!("fanout.max_concurrency must be positive");
        }
        self.fanout_config()?;
        self.static_peers()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .listen
            .parse()
            .with_context(|| format!("Invalid listen address: {}", self.server.listen))
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        FlushPolicy {
            batch_size: self.traces.sync_batch_size,
            interval: Duration::from_millis(self.traces.sync_interval),
            ttl: (self.traces.ttl > 0).then(|| Duration::from_secs(self.traces.ttl)),
        }
    }

    pub fn fjall_config(&self) -> FjallConfig {
        FjallConfig {
            path: self.fjall.path.clone(),
            gc_interval: Duration::from_secs(self.fjall.gc_interval),
            gc_space_amp_target: self.fjall.gc_space_amp_target,
        }
    }

    pub fn redis_config(&self) -> RedisConfig {
        RedisConfig {
            url: self.redis.url.clone(),
            probe_interval: Duration::from_millis(self.redis.probe_interval),
        }
    }

    pub fn fanout_config(&self) -> anyhow::Result<FanoutConfig> {
        let timeout = parse_duration(&self.fanout.timeout)
            .with_context(|| format!("Invalid fanout.timeout: {}", self.fanout.timeout))?;
        Ok(FanoutConfig {
            namespace: self.fanout.namespace.clone(),
            label_selector: self.fanout.label_selector.clone(),
            peer_port: self.fanout.peer_port,
            timeout,
            max_concurrency: self.fanout.max_concurrency,
        })
    }

    pub fn static_peers(&self) -> anyhow::Result<Vec<PeerEntry>> {
        self.fanout
            .static_peers
            .iter()
            .map(|entry| {
                entry
                    .parse::<PeerEntry>()
                    .with_context(|| format!("Invalid static peer: {entry}"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.flush_policy(), FlushPolicy::default());
        assert_eq!(config.traces.spans_per_trace, 10);
        assert_eq!(config.fjall_config(), FjallConfig::default());
        assert_eq!(config.redis_config(), RedisConfig::default());
        assert_eq!(config.fanout_config().unwrap(), FanoutConfig::default());
        assert_eq!(config.logs.level, "info");
        assert!(!config.fjall.enabled);
        assert!(!config.redis.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_yaml_overlays_defaults() {
        let yaml = r#"
server:
  listen: "127.0.0.1:9000"
traces:
  sync_batch_size: 500
  ttl: 0
  failure_policy: abort-run
fjall:
  enabled: true
  path: /tmp/spans
fanout:
  timeout: 2m
  static_peers:
    - "pod-a=10.0.0.1"
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.listen_addr().unwrap().port(), 9000);
        let policy = config.flush_policy();
        assert_eq!(policy.batch_size, 500);
        assert_eq!(policy.interval, DEFAULT_FLUSH_INTERVAL);
        assert_eq!(policy.ttl, None);
        assert_eq!(config.traces.failure_policy, FailurePolicy::AbortRun);
        assert!(config.fjall.enabled);
        assert_eq!(config.fjall_config().path, PathBuf::from("/tmp/spans"));
        assert_eq!(config.fanout_config().unwrap().timeout, Duration::from_secs(120));
        assert_eq!(
            config.static_peers().unwrap(),
            vec![PeerEntry::new("pod-a", "10.0.0.1")]
        );
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(AppConfig::from_yaml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(AppConfig::from_yaml("traces:\n  batch: 5\n").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_thresholds() {
        let mut config = AppConfig::default();
        config.traces.sync_batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.fanout.timeout = "soon".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.listen = "nowhere".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("kv-loadtest.yaml");
        std::fs::write(&path, "redis:\n  enabled: true\n  probe_interval: 250\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert!(config.redis.enabled);
        assert_eq!(config.redis_config().probe_interval, Duration::from_millis(250));
        assert!(AppConfig::from_file(dir.path().join("missing.yaml")).is_err());
    }
}
