//! Command-line overlay of the configuration file.

use super::AppConfig;
use crate::orchestrator::FailurePolicy;
use anyhow::Context;
use clap::Args;
use loadtest_distributed::FanoutArgs;
use loadtest_pipeline_fjall::FjallArgs;
use loadtest_pipeline_redis::RedisArgs;
use std::path::PathBuf;

/// Flags shared by every command. Unset flags keep the value from the YAML
/// file, which in turn falls back to the built-in defaults.
#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// YAML configuration file
    #[arg(long = "config", value_name = "PATH", env = "KV_LOADTEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address the trigger surface listens on
    #[arg(long, env = "LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Milliseconds after which pending writes are flushed
    #[arg(long = "sync-interval", env = "TRACES_SYNC_INTERVAL")]
    pub sync_interval_ms: Option<u64>,

    /// Pending writes above which a put flushes
    #[arg(long = "sync-batch-size", env = "TRACES_SYNC_BATCH_SIZE")]
    pub sync_batch_size: Option<usize>,

    /// Entry time-to-live in seconds (0 disables expiry)
    #[arg(long = "ttl", env = "TRACES_TTL")]
    pub ttl_secs: Option<u64>,

    /// Spans generated per trace
    #[arg(long, env = "TRACES_SPANS_PER_TRACE")]
    pub spans_per_trace: Option<u64>,

    /// What a failing trace does to the rest of the run
    #[arg(long, value_enum)]
    pub failure_policy: Option<FailurePolicy>,

    /// Fixed generator seed for reproducible ids
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Enable the embedded fjall backend
    #[arg(long)]
    pub enable_fjall: bool,

    /// Enable the Redis backend
    #[arg(long)]
    pub enable_redis: bool,

    #[command(flatten)]
    pub fjall: FjallArgs,

    #[command(flatten)]
    pub redis: RedisArgs,

    #[command(flatten)]
    pub fanout: FanoutArgs,
}

impl ConfigArgs {
    /// Build and validate the effective configuration.
    pub fn load(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        self.apply(&mut config);
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Overwrite every setting given on the command line.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(listen) = &self.listen {
            config.server.listen.clone_from(listen);
        }

        let traces = &mut config.traces;
        if let Some(ms) = self.sync_interval_ms {
            traces.sync_interval = ms;
        }
        if let Some(size) = self.sync_batch_size {
            traces.sync_batch_size = size;
        }
        if let Some(ttl) = self.ttl_secs {
            traces.ttl = ttl;
        }
        if let Some(n) = self.spans_per_trace {
            traces.spans_per_trace = n;
        }
        if let Some(policy) = self.failure_policy {
            traces.failure_policy = policy;
        }
        if self.seed.is_some() {
            traces.seed = self.seed;
        }

        if self.enable_fjall {
            config.fjall.enabled = true;
        }
        if let Some(path) = &self.fjall.path {
            config.fjall.path.clone_from(path);
        }
        if let Some(secs) = self.fjall.gc_interval_secs {
            config.fjall.gc_interval = secs;
        }
        if let Some(target) = self.fjall.gc_space_amp_target {
            config.fjall.gc_space_amp_target = target;
        }

        if self.enable_redis {
            config.redis.enabled = true;
        }
        if let Some(url) = &self.redis.url {
            config.redis.url.clone_from(url);
        }
        if let Some(ms) = self.redis.probe_interval_ms {
            config.redis.probe_interval = ms;
        }

        let fanout = &mut config.fanout;
        if let Some(namespace) = &self.fanout.namespace {
            fanout.namespace.clone_from(namespace);
        }
        if let Some(selector) = &self.fanout.label_selector {
            fanout.label_selector.clone_from(selector);
        }
        if let Some(port) = self.fanout.peer_port {
            fanout.peer_port = port;
        }
        if let Some(timeout) = &self.fanout.timeout {
            fanout.timeout.clone_from(timeout);
        }
        if let Some(n) = self.fanout.max_concurrency {
            fanout.max_concurrency = n;
        }
        if !self.fanout.static_peers.is_empty() {
            fanout.static_peers.clone_from(&self.fanout.static_peers);
        }

        if let Some(level) = &self.log_level {
            config.logs.level.clone_from(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ConfigArgs,
    }

    fn parse(argv: &[&str]) -> ConfigArgs {
        TestCli::parse_from(std::iter::once("kv-loadtest").chain(argv.iter().copied())).args
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "traces:\n  sync_batch_size: 50\n  spans_per_trace: 4\n").unwrap();

        let args = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--sync-batch-size",
            "7",
            "--enable-fjall",
            "--fjall-path",
            "/var/lib/spans",
            "--static-peer",
            "a=10.0.0.1,b=10.0.0.2",
            "--failure-policy",
            "abort-run",
        ]);
        let config = args.load().unwrap();

        assert_eq!(config.traces.sync_batch_size, 7);
        assert_eq!(config.traces.spans_per_trace, 4);
        assert_eq!(config.traces.failure_policy, FailurePolicy::AbortRun);
        assert!(config.fjall.enabled);
        assert_eq!(config.fjall.path, PathBuf::from("/var/lib/spans"));
        assert_eq!(config.static_peers().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let args = parse(&["--fanout-timeout", "eventually"]);
        assert!(args.load().is_err());
    }
}
