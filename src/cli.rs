//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{OutputFormat, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(name = "geoipgen")]
#[command(author, version, about = "GeoIP dataset builder for V2Ray-style routers")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (defaults are used when it does not exist)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the GeoIP dataset
    Build(BuildArgs),

    /// Inspect online list providers
    Providers {
        #[command(subcommand)]
        action: ProvidersAction,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Country location table (GeoLite2-Country-Locations CSV)
    #[arg(long)]
    pub country: PathBuf,

    /// IPv4 block file (GeoLite2-Country-Blocks-IPv4 CSV)
    #[arg(long)]
    pub ipv4: PathBuf,

    /// IPv6 block file (GeoLite2-Country-Blocks-IPv6 CSV)
    #[arg(long)]
    pub ipv6: PathBuf,

    /// Directory of supplementary list files (overrides config)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Output file (overrides config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Emit a separate entry for repeated group names instead of merging them
    #[arg(long)]
    pub append_duplicates: bool,
}

#[derive(Subcommand)]
pub enum ProvidersAction {
    /// List registered providers
    List,

    /// Run one provider and print its merged ranges
    Fetch {
        /// Provider name (as shown by `providers list`)
        name: String,
    },
}
