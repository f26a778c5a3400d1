//! Build command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::BuildArgs;
use crate::config::{CollisionPolicy, Config};
use crate::fetcher::Fetcher;
use crate::output::writer_for;
use crate::pipeline::{Pipeline, StaticInputs};
use crate::registry::ProviderRegistry;
use crate::utils::{format_addresses, format_bytes, format_count};

/// Run the build command
pub async fn run(args: BuildArgs, config_path: &Path) -> Result<()> {
    let mut config = Config::load_or_default(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    apply_overrides(&mut config, &args);

    let fetcher = Arc::new(Fetcher::new(&config.http)?);
    let registry = ProviderRegistry::from_config(&config, fetcher.clone())?;
    info!("Providers: {}", registry.names().join(", "));

    let inputs = StaticInputs {
        country_codes: args.country,
        ipv4_blocks: args.ipv4,
        ipv6_blocks: args.ipv6,
        data_dir: Some(config.data_dir.clone()),
    };

    let result = Pipeline::from_config(&registry, &config)
        .run(&inputs)
        .await?;

    writer_for(config.output.format)
        .write(&result, &config.output.path)
        .context("Failed to write output")?;
    debug!(
        "Downloaded {} in total",
        format_bytes(fetcher.total_downloaded() as u64)
    );

    println!();
    println!(
        "[OK] {} groups, {} ranges ({} addresses) written to {}",
        format_count(result.len()),
        format_count(result.total_ranges()),
        format_addresses(result.total_addresses()),
        config.output.path.display()
    );

    Ok(())
}

/// Command-line flags take precedence over the configuration file.
pub fn apply_overrides(config: &mut Config, args: &BuildArgs) {
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(path) = &args.output {
        config.output.path = path.clone();
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if args.append_duplicates {
        config.collision = CollisionPolicy::Append;
    }
}
