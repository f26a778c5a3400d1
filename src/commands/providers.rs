//! Providers command implementation.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::cli::ProvidersAction;
use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::registry::{FetchOptions, ProviderRegistry};
use crate::utils::format_count;
use crate::validation::provider_key;

/// Run the providers command
pub async fn run(action: ProvidersAction, config_path: &Path) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let fetcher = Arc::new(Fetcher::new(&config.http)?);
    let registry = ProviderRegistry::from_config(&config, fetcher)?;

    match action {
        ProvidersAction::List => {
            if registry.is_empty() {
                println!("No providers enabled.");
            }
            for name in registry.names() {
                println!("{}", name);
            }
            Ok(())
        }
        ProvidersAction::Fetch { name } => {
            let options = FetchOptions::from_config(&config.providers);
            let ranges = fetch_one(&registry, &name, &options).await?;
            info!("[{}] {} ranges", name, format_count(ranges.len()));
            for range in ranges {
                println!("{}", range);
            }
            Ok(())
        }
    }
}

/// Run a single provider by name, bounded by the provider timeout.
pub async fn fetch_one(
    registry: &ProviderRegistry,
    name: &str,
    options: &FetchOptions,
) -> Result<Vec<String>> {
    let Some(provider) = registry.lookup(&provider_key(name)) else {
        anyhow::bail!(
            "Unknown provider '{}'. Available: {}",
            name,
            registry.names().join(", ")
        );
    };

    match tokio::time::timeout(options.timeout, provider.fetch_and_merge(options.policy)).await {
        Ok(ranges) => Ok(ranges),
        Err(_) => anyhow::bail!("Provider '{}' timed out after {:?}", name, options.timeout),
    }
}
