//! Cloud and CDN providers that publish their ranges as JSON documents.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::SourceProvider;
use crate::fetcher::HttpSource;

const GITHUB_META_URL: &str = "https://api.github.com/meta";
const GOOGLE_CLOUD_URL: &str = "https://www.gstatic.com/ipranges/cloud.json";
const AWS_RANGES_URL: &str = "https://ip-ranges.amazonaws.com/ip-ranges.json";
const FASTLY_URL: &str = "https://api.fastly.com/public-ip-list";

/// Fetch a JSON document; an empty body is an empty list, not a parse error.
async fn fetch_json<T>(http: &dyn HttpSource, url: &str) -> Result<Option<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let body = http.get_text(url).await;
    if body.trim().is_empty() {
        return Ok(None);
    }
    let doc = serde_json::from_str(&body).with_context(|| format!("Invalid JSON from {}", url))?;
    Ok(Some(doc))
}

/// GitHub service ranges (hooks, web, api, git, actions)
pub struct GithubProvider {
    http: Arc<dyn HttpSource>,
}

impl GithubProvider {
    pub fn new(http: Arc<dyn HttpSource>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceProvider for GithubProvider {
    fn name(&self) -> &str {
        "github"
    }

    async fn fetch_raw(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct GitHubMeta {
            hooks: Option<Vec<String>>,
            web: Option<Vec<String>>,
            api: Option<Vec<String>>,
            git: Option<Vec<String>>,
            actions: Option<Vec<String>>,
        }

        let Some(meta) = fetch_json::<GitHubMeta>(self.http.as_ref(), GITHUB_META_URL).await?
        else {
            return Ok(Vec::new());
        };

        Ok([meta.hooks, meta.web, meta.api, meta.git, meta.actions]
            .into_iter()
            .flatten()
            .flatten()
            .collect())
    }
}

/// Google Cloud ranges
pub struct GoogleCloudProvider {
    http: Arc<dyn HttpSource>,
}

impl GoogleCloudProvider {
    pub fn new(http: Arc<dyn HttpSource>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceProvider for GoogleCloudProvider {
    fn name(&self) -> &str {
        "google-cloud"
    }

    async fn fetch_raw(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct GoogleCloudRanges {
            prefixes: Vec<GooglePrefix>,
        }

        #[derive(Deserialize)]
        struct GooglePrefix {
            #[serde(rename = "ipv4Prefix")]
            ipv4_prefix: Option<String>,
        }

        let ranges =
            fetch_json::<GoogleCloudRanges>(self.http.as_ref(), GOOGLE_CLOUD_URL).await?;
        Ok(ranges
            .map(|r| r.prefixes.into_iter().filter_map(|p| p.ipv4_prefix).collect())
            .unwrap_or_default())
    }
}

/// AWS ranges (all services, IPv4 prefixes)
pub struct AwsProvider {
    http: Arc<dyn HttpSource>,
}

impl AwsProvider {
    pub fn new(http: Arc<dyn HttpSource>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceProvider for AwsProvider {
    fn name(&self) -> &str {
        "aws"
    }

    async fn fetch_raw(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct AwsRanges {
            prefixes: Vec<AwsPrefix>,
        }

        #[derive(Deserialize)]
        struct AwsPrefix {
            ip_prefix: String,
        }

        let ranges = fetch_json::<AwsRanges>(self.http.as_ref(), AWS_RANGES_URL).await?;
        Ok(ranges
            .map(|r| r.prefixes.into_iter().map(|p| p.ip_prefix).collect())
            .unwrap_or_default())
    }
}

/// Fastly edge ranges
pub struct FastlyProvider {
    http: Arc<dyn HttpSource>,
}

impl FastlyProvider {
    pub fn new(http: Arc<dyn HttpSource>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceProvider for FastlyProvider {
    fn name(&self) -> &str {
        "fastly"
    }

    async fn fetch_raw(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct FastlyRanges {
            addresses: Vec<String>,
        }

        let ranges = fetch_json::<FastlyRanges>(self.http.as_ref(), FASTLY_URL).await?;
        Ok(ranges.map(|r| r.addresses).unwrap_or_default())
    }
}
