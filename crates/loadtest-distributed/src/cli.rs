//! CLI argument definitions for fan-out.

use clap::Args;

/// Fan-out arguments. Unset values fall back to the configuration file and
/// then to built-in defaults.
#[derive(Args, Clone, Debug, Default)]
pub struct FanoutArgs {
    /// Kubernetes namespace of the replicas
    #[arg(long, env = "FANOUT_NAMESPACE")]
    pub namespace: Option<String>,

    /// Label selector identifying the replicas
    #[arg(long, env = "FANOUT_LABEL_SELECTOR")]
    pub label_selector: Option<String>,

    /// HTTP port replicas listen on
    #[arg(long, env = "FANOUT_PEER_PORT")]
    pub peer_port: Option<u16>,

    /// Per-call timeout (e.g. "30s", "2m")
    #[arg(long = "fanout-timeout", env = "FANOUT_TIMEOUT")]
    pub timeout: Option<String>,

    /// Maximum number of replicas called at once
    #[arg(long, env = "FANOUT_MAX_CONCURRENCY")]
    pub max_concurrency: Option<usize>,

    /// Static replica list instead of Kubernetes discovery (name=address, repeatable)
    #[arg(long = "static-peer", value_delimiter = ',')]
    pub static_peers: Vec<String>,
}
