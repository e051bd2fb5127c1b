//! CLI argument definitions for the fjall backend.

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Default period of the garbage collection ticker.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(300);

/// Default value-log space amplification target.
pub const DEFAULT_GC_SPACE_AMP_TARGET: f32 = 1.5;

/// fjall-specific arguments.
#[derive(Args, Clone, Debug)]
pub struct FjallArgs {
    /// Directory of the fjall keyspace
    #[arg(long = "fjall-path", env = "FJALL_PATH")]
    pub path: Option<PathBuf>,

    /// Seconds between garbage collection runs
    #[arg(long = "fjall-gc-interval", env = "FJALL_GC_INTERVAL")]
    pub gc_interval_secs: Option<u64>,

    /// Space amplification target for value-log garbage collection
    #[arg(long = "fjall-gc-space-amp-target", env = "FJALL_GC_SPACE_AMP_TARGET")]
    pub gc_space_amp_target: Option<f32>,
}

/// Effective fjall settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FjallConfig {
    pub path: PathBuf,
    pub gc_interval: Duration,
    pub gc_space_amp_target: f32,
}

impl FjallConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            gc_interval: DEFAULT_GC_INTERVAL,
            gc_space_amp_target: DEFAULT_GC_SPACE_AMP_TARGET,
        }
    }
}

impl Default for FjallConfig {
    fn default() -> Self {
        Self::new("./data/fjall")
    }
}
