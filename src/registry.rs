//! Provider registry.
//!
//! The registry is built once at start-up and then only read. Keys are the
//! providers' lower-cased names; registering a name twice keeps the later
//! provider.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Config, CustomProvider, ProvidersConfig};
use crate::error::GeoipError;
use crate::fetcher::HttpSource;
use crate::provider::{
    AwsProvider, FastlyProvider, GithubProvider, GoogleCloudProvider, MalformedPolicy,
    SourceProvider, StaticProvider, UrlListProvider,
};
use crate::utils::format_count;
use crate::validation::provider_key;

/// Per-run settings for [`ProviderRegistry::fetch_all`]
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Upper bound for one provider; exceeding it yields an empty group
    pub timeout: Duration,
    pub max_concurrent: usize,
    pub policy: MalformedPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from_config(&ProvidersConfig::default())
    }
}

impl FetchOptions {
    pub fn from_config(config: &ProvidersConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_concurrent: config.max_concurrent,
            policy: MalformedPolicy::from_flag(config.drop_group_on_malformed),
        }
    }
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn SourceProvider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry described by the configuration.
    ///
    /// Built-ins are registered first, so a custom provider with the same
    /// name replaces the built-in one.
    pub fn from_config(config: &Config, http: Arc<dyn HttpSource>) -> Result<Self> {
        let mut registry = Self::new();
        let builtin = &config.providers.builtin;

        if builtin.telegram {
            registry.register(Arc::new(UrlListProvider::telegram(http.clone())))?;
        }
        if builtin.cloudflare {
            registry.register(Arc::new(UrlListProvider::cloudflare(http.clone())))?;
        }
        if builtin.github {
            registry.register(Arc::new(GithubProvider::new(http.clone())))?;
        }
        if builtin.google_cloud {
            registry.register(Arc::new(GoogleCloudProvider::new(http.clone())))?;
        }
        if builtin.aws {
            registry.register(Arc::new(AwsProvider::new(http.clone())))?;
        }
        if builtin.fastly {
            registry.register(Arc::new(FastlyProvider::new(http.clone())))?;
        }

        for custom in &config.providers.custom {
            let provider: Arc<dyn SourceProvider> = match custom {
                CustomProvider::Url(source) => Arc::new(UrlListProvider::new(
                    source.name.clone(),
                    source.url.clone(),
                    http.clone(),
                )),
                CustomProvider::Static(source) => Arc::new(StaticProvider::new(
                    source.name.clone(),
                    source.ranges.clone(),
                )),
            };
            registry.register(provider)?;
        }

        debug!("Registered providers: {:?}", registry.names());
        Ok(registry)
    }

    /// Register a provider under its lower-cased name.
    ///
    /// An empty name is rejected and leaves the registry untouched.
    pub fn register(&mut self, provider: Arc<dyn SourceProvider>) -> Result<(), GeoipError> {
        let key = provider_key(provider.name());
        if key.is_empty() {
            return Err(GeoipError::EmptyProviderName);
        }
        if self.providers.insert(key.clone(), provider).is_some() {
            debug!("Provider '{}' replaced by a later registration", key);
        }
        Ok(())
    }

    /// Exact lookup by registry key (keys are stored lower-case).
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn SourceProvider>> {
        self.providers.get(name).cloned()
    }

    /// Registered keys, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Run every provider and collect `key -> merged ranges`.
    ///
    /// Providers run concurrently and in no particular order. A provider that
    /// fails or exceeds `options.timeout` contributes an empty list.
    pub async fn fetch_all(&self, options: &FetchOptions) -> BTreeMap<String, Vec<String>> {
        let max_concurrent = options.max_concurrent.max(1);

        stream::iter(self.providers.iter().map(|(key, provider)| async move {
            let ranges = match tokio::time::timeout(
                options.timeout,
                provider.fetch_and_merge(options.policy),
            )
            .await
            {
                Ok(ranges) => ranges,
                Err(_) => {
                    warn!("[{}] timed out after {:?}", key, options.timeout);
                    Vec::new()
                }
            };
            info!("Fetched {} - {} ranges", key, format_count(ranges.len()));
            (key.clone(), ranges)
        }))
        .buffer_unordered(max_concurrent)
        .collect()
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::MockHttpSource;
    use async_trait::async_trait;

    struct Slow;

    #[async_trait]
    impl SourceProvider for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch_raw(&self) -> Result<Vec<String>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec!["10.0.0.0/8".to_string()])
        }
    }

    fn quick_options() -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_millis(200),
            max_concurrent: 4,
            policy: MalformedPolicy::SkipEntry,
        }
    }

    fn unused_http() -> Arc<dyn HttpSource> {
        Arc::new(MockHttpSource::new())
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(Arc::new(StaticProvider::new("Alpha", ["10.0.0.0/8"])))
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("alpha").is_some());
        // Stored lower-case, looked up exactly
        assert!(registry.lookup("Alpha").is_none());
        assert!(registry.lookup("beta").is_none());
    }

    #[test]
    fn test_register_empty_name_rejected() {
        let mut registry = ProviderRegistry::new();
        let result = registry.register(Arc::new(StaticProvider::new("", ["10.0.0.0/8"])));
        assert!(matches!(result, Err(GeoipError::EmptyProviderName)));
        let result = registry.register(Arc::new(StaticProvider::new("   ", ["10.0.0.0/8"])));
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = ProviderRegistry::new();
        for name in ["gamma", "alpha", "beta"] {
            registry
                .register(Arc::new(StaticProvider::new(name, Vec::<String>::new())))
                .unwrap();
        }
        assert_eq!(registry.names(), vec!["alpha", "beta", "gamma"]);
        assert!(format!("{:?}", registry).contains("alpha"));
    }

    #[tokio::test]
    async fn test_fetch_all_empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.fetch_all(&quick_options()).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_timeout_yields_empty_group() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(Slow)).unwrap();
        registry
            .register(Arc::new(StaticProvider::new("fast", ["1.1.1.0/24"])))
            .unwrap();

        let result = registry.fetch_all(&quick_options()).await;
        assert_eq!(result.len(), 2);
        assert!(result["slow"].is_empty());
        assert_eq!(result["fast"], vec!["1.1.1.0/24"]);
    }

    #[test]
    fn test_from_config_defaults_to_telegram() {
        let registry = ProviderRegistry::from_config(&Config::default(), unused_http()).unwrap();
        assert_eq!(registry.names(), vec!["telegram"]);
    }

    #[test]
    fn test_from_config_builtins_and_custom() {
        let yaml = r#"
providers:
  builtin:
    telegram: true
    cloudflare: true
    github: true
    google_cloud: true
    aws: true
    fastly: true
  custom:
    - name: Office
      static: ["10.1.0.0/16"]
    - name: partner
      url: https://example.com/partner.txt
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let registry = ProviderRegistry::from_config(&config, unused_http()).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "aws",
                "cloudflare",
                "fastly",
                "github",
                "google-cloud",
                "office",
                "partner",
                "telegram"
            ]
        );
    }

    #[tokio::test]
    async fn test_custom_provider_overrides_builtin() {
        let yaml = "providers:\n  custom:\n    - name: Telegram\n      static: [\"91.108.4.0/22\"]\n";
        let config = Config::from_yaml(yaml).unwrap();
        let registry = ProviderRegistry::from_config(&config, unused_http()).unwrap();
        assert_eq!(registry.len(), 1);

        let result = registry.fetch_all(&quick_options()).await;
        assert_eq!(result["telegram"], vec!["91.108.4.0/22"]);
    }
}
