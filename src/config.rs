//! Configuration management for geoipgen.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::validation::{provider_key, validate_source_url};

/// Default configuration file, looked up relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "geoipgen.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding supplementary list files (one group per file)
    pub data_dir: PathBuf,

    /// Where and how the result is written
    pub output: OutputConfig,

    /// What happens when a group name appears in more than one source
    pub collision: CollisionPolicy,

    /// HTTP client settings
    pub http: HttpConfig,

    /// Online list providers
    pub providers: ProvidersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output: OutputConfig::default(),
            collision: CollisionPolicy::Union,
            http: HttpConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to load config file: {:?}", path.as_ref()))
    }

    /// Load configuration, falling back to defaults when the file is absent.
    ///
    /// A file that exists but does not parse or validate is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            debug!("No config file at {:?}, using defaults", path.as_ref());
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be at least 1");
        }
        if self.http.max_body_bytes == 0 {
            anyhow::bail!("http.max_body_bytes must be at least 1");
        }
        if self.providers.timeout_secs == 0 {
            anyhow::bail!("providers.timeout_secs must be at least 1");
        }
        if self.providers.max_concurrent == 0 {
            anyhow::bail!("providers.max_concurrent must be at least 1");
        }

        // Custom providers must have distinct, non-empty names
        let mut seen = HashSet::new();
        for custom in &self.providers.custom {
            let key = provider_key(custom.name());
            if key.is_empty() {
                anyhow::bail!("Custom provider names must not be empty");
            }
            if !seen.insert(key.clone()) {
                anyhow::bail!("Duplicate custom provider name '{}'", key);
            }
            if let CustomProvider::Url(source) = custom {
                validate_source_url(&source.url)
                    .with_context(|| format!("Invalid URL for provider '{}'", source.name))?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("geoip.dat"),
            format: OutputFormat::Dat,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Protobuf GeoIP list, as loaded by V2Ray-style routers
    #[default]
    Dat,
    /// Human-readable JSON
    Json,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// One entry per name, ranges unioned and re-merged
    #[default]
    Union,
    /// Repeated names get an additional entry (reproduces older artifacts)
    Append,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Extra attempts after the first failure (0 = no retry)
    pub max_retries: u32,
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 0,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Upper bound for one provider's fetch-and-merge
    pub timeout_secs: u64,
    pub max_concurrent: usize,
    /// Discard a provider's whole list when any entry is malformed
    pub drop_group_on_malformed: bool,
    pub builtin: BuiltinProviders,
    pub custom: Vec<CustomProvider>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_concurrent: 4,
            drop_group_on_malformed: false,
            builtin: BuiltinProviders::default(),
            custom: Vec::new(),
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Built-in service providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuiltinProviders {
    pub telegram: bool,
    pub cloudflare: bool,
    pub github: bool,
    pub google_cloud: bool,
    pub aws: bool,
    pub fastly: bool,
}

impl Default for BuiltinProviders {
    fn default() -> Self {
        Self {
            telegram: true,
            cloudflare: false,
            github: false,
            google_cloud: false,
            aws: false,
            fastly: false,
        }
    }
}

/// Provider defined in the configuration file.
///
/// An entry carries exactly one of `url` or `static`; an entry with both, or
/// with an unknown key, does not parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CustomProvider {
    Url(UrlSource),
    Static(InlineSource),
}

/// Plain-text list fetched from a URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UrlSource {
    pub name: String,
    pub url: String,
}

/// Ranges listed inline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InlineSource {
    pub name: String,
    #[serde(rename = "static")]
    pub ranges: Vec<String>,
}

impl CustomProvider {
    pub fn name(&self) -> &str {
        match self {
            CustomProvider::Url(source) => &source.name,
            CustomProvider::Static(source) => &source.name,
        }
    }
}
