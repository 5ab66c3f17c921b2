//! CLI for cudascope
//!
//! Works on recorded message logs:
//! - replay: Run a log through the aggregation pipeline
//! - features: Run a log through a clustering leaf and print feature vectors
//! - dump: Print the CUDA blobs of a log

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod log;
mod output;

#[derive(Parser)]
#[command(name = "cudascope")]
#[command(about = "cudascope - CUDA performance data aggregation", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a message log through the aggregation pipeline
    Replay(commands::replay::ReplayArgs),

    /// Compute per-thread feature vectors from a message log
    Features(commands::features::FeaturesArgs),

    /// Print every CUDA blob in a message log
    Dump(commands::dump::DumpArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Replay(args) => commands::replay::run(args),
        Commands::Features(args) => commands::features::run(args),
        Commands::Dump(args) => commands::dump::run(args),
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
