//! Plain-text lists: one range per line, `#` comments.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::SourceProvider;
use crate::fetcher::HttpSource;
use crate::loader::parse_plain_list;

pub const TELEGRAM_URL: &str = "https://core.telegram.org/resources/cidr.txt";
pub const CLOUDFLARE_URL: &str = "https://www.cloudflare.com/ips-v4";

/// Provider backed by a plain-text list at a fixed URL
pub struct UrlListProvider {
    name: String,
    url: String,
    http: Arc<dyn HttpSource>,
}

impl UrlListProvider {
    pub fn new(name: impl Into<String>, url: impl Into<String>, http: Arc<dyn HttpSource>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            http,
        }
    }

    /// Telegram's published data-center ranges
    pub fn telegram(http: Arc<dyn HttpSource>) -> Self {
        Self::new("telegram", TELEGRAM_URL, http)
    }

    /// Cloudflare's published IPv4 edge ranges
    pub fn cloudflare(http: Arc<dyn HttpSource>) -> Self {
        Self::new("cloudflare", CLOUDFLARE_URL, http)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SourceProvider for UrlListProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_raw(&self) -> Result<Vec<String>> {
        let body = self.http.get_text(&self.url).await;
        Ok(parse_plain_list(&body))
    }
}
