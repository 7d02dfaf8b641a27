use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, error};

use orderflow::config::PipelineConfig;
use orderflow::pipeline::Orchestrator;
use orderflow::reference::ReferenceStore;
use orderflow::registry::IdempotencyRegistry;
use orderflow::report;

/// Batch order submission pipeline with idempotent, audited output
#[derive(Parser)]
#[command(name = "orderflow")]
#[command(about = "Validate and submit order batches with retry and idempotency", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over an order batch
    Run {
        /// Path to the configuration file
        #[arg(short = 'c', long, default_value = "config.json")]
        config: PathBuf,

        /// Order batch CSV
        #[arg(long, default_value = "data/input/orders.csv")]
        orders: PathBuf,

        /// Customer reference CSV
        #[arg(long, default_value = "data/input/customers.csv")]
        customers: PathBuf,

        /// Directory for the ledger, summary, registry, and checksums
        #[arg(long, default_value = "data/output")]
        out_dir: PathBuf,
    },
    /// Serve the stand-in order acceptance endpoint
    Serve {
        /// Path to the configuration file
        #[arg(short = 'c', long, default_value = "config.json")]
        config: PathBuf,

        /// JSON store for accepted orders
        #[arg(long, default_value = "data/output/api_store.json")]
        store: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("orderflow started with verbosity level {}", cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            orders,
            customers,
            out_dir,
        } => run_pipeline(config, orders, customers, out_dir).await,
        Commands::Serve { config, store } => run_server(config, store).await,
    };

    if let Err(e) = result {
        error!("fatal: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_pipeline(
    config: PathBuf,
    orders: PathBuf,
    customers: PathBuf,
    out_dir: PathBuf,
) -> anyhow::Result<()> {
    let config = PipelineConfig::load(&config)?;
    let reference = ReferenceStore::load(&customers)?;
    let registry = IdempotencyRegistry::load_or_create(&report::registry_path(&out_dir))?;

    let mut orchestrator = Orchestrator::new(config, reference, registry)?;
    orchestrator.run(&orders, &out_dir).await?;
    Ok(())
}

async fn run_server(config: PathBuf, store: PathBuf) -> anyhow::Result<()> {
    let config = PipelineConfig::load(&config)?;
    orderflow::serve::run(&config, store).await?;
    Ok(())
}
