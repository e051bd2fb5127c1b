//! Command-line interface for kv-loadtest
//!
//! # Usage Examples
//!
//! ## Serve
//! ```bash
//! # Trigger surface with the embedded backend, flushing every 500 ms
//! kv-loadtest serve --enable-fjall --fjall-path ./data/fjall --sync-interval 500
//!
//! # Settings from a YAML file, overridden by flags
//! kv-loadtest serve --config kv-loadtest.yaml --listen 0.0.0.0:9090
//! ```
//!
//! ## One-shot Runs
//! ```bash
//! # Generate 50 traces of 10 spans against Redis
//! kv-loadtest generate --backend redis --trace-count 50 --redis-url redis://localhost:6379/0
//!
//! # Ask every replica for 20 traces
//! kv-loadtest fanout --backend fjall --trace-count-per-pod 20
//! ```
//!
//! ## Maintenance
//! ```bash
//! kv-loadtest count --fjall-path ./data/fjall
//! kv-loadtest gc --fjall-path ./data/fjall
//! kv-loadtest compact --fjall-path ./data/fjall --levels 3
//! ```

use clap::{Parser, Subcommand};
use kv_loadtest::loadtest::fanout::run_fanout;
use kv_loadtest::loadtest::generate::{print_report, run_generate};
use kv_loadtest::loadtest::maintenance::{run_compact, run_count, run_gc};
use kv_loadtest::loadtest::serve::run_serve;
use kv_loadtest::{AppConfig, BackendKind, ConfigArgs};
use loadtest_distributed::WorkCount;

#[derive(Parser)]
#[command(name = "kv-loadtest")]
#[command(about = "Generate trace-shaped load against key-value stores")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP trigger surface with the enabled backends
    Serve {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Run one generate locally and print the report as JSON
    Generate {
        /// Backend to write to
        #[arg(long, value_enum)]
        backend: BackendKind,

        /// Number of traces to generate
        #[arg(long, default_value = "2")]
        trace_count: u64,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Split a load request across every discovered replica
    Fanout {
        /// Backend whose trigger route the replicas are called on
        #[arg(long, value_enum)]
        backend: BackendKind,

        /// Total traces, divided evenly across replicas
        #[arg(long)]
        trace_count: Option<u64>,

        /// Traces per replica, sent verbatim
        #[arg(long)]
        trace_count_per_pod: Option<u64>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Compact the embedded keyspace
    Compact {
        /// Compaction passes to run at most
        #[arg(long)]
        levels: Option<usize>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Remove expired entries and reclaim value-log space in the embedded keyspace
    Gc {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Count live entries in the embedded keyspace
    Count {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

impl Commands {
    fn config_args(&self) -> &ConfigArgs {
        match self {
            Self::Serve { config }
            | Self::Generate { config, .. }
            | Self::Fanout { config, .. }
            | Self::Compact { config, .. }
            | Self::Gc { config }
            | Self::Count { config } => config,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logs.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.command.config_args().load()?;
    init_tracing(&config);

    match cli.command {
        Commands::Serve { .. } => {
            run_serve(config).await?;
        }
        Commands::Generate {
            backend,
            trace_count,
            ..
        } => {
            let report = run_generate(&config, backend, trace_count).await?;
            print_report(&report)?;
        }
        Commands::Fanout {
            backend,
            trace_count,
            trace_count_per_pod,
            ..
        } => {
            let count = WorkCount::from_params(trace_count_per_pod, trace_count);
            let report = run_fanout(&config, backend, count).await?;
            println!("{report}");
        }
        Commands::Compact { levels, .. } => {
            let report = run_compact(&config, levels).await?;
            println!(
                "Compaction: {} passes, {} -> {} bytes",
                report.passes, report.disk_space_before, report.disk_space_after
            );
        }
        Commands::Gc { .. } => {
            let report = run_gc(&config).await?;
            println!(
                "GC: {} expired entries removed, {} bytes reclaimed",
                report.expired_removed, report.bytes_reclaimed
            );
        }
        Commands::Count { .. } => {
            println!("Count: {}", run_count(&config).await?);
        }
    }

    Ok(())
}
