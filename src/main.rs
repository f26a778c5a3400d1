//! geoipgen - GeoIP dataset builder
//!
//! Merges GeoLite2-style country tables, local lists and online range lists
//! into a single `geoip.dat`.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use geoipgen::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Build(args) => geoipgen::commands::build::run(args, &cli.config).await,
        Commands::Providers { action } => {
            geoipgen::commands::providers::run(action, &cli.config).await
        }
    }
}
