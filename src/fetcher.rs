//! HTTP fetcher for downloading online range lists.
//!
//! Providers never see transport errors: [`HttpSource::get_text`] logs the
//! failure and hands back an empty body, which providers already treat as an
//! empty list.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::config::HttpConfig;
use crate::utils::format_bytes;

const RETRY_DELAY_MS: u64 = 2000;

/// Maximum total size for all downloads combined (50 MB)
const MAX_TOTAL_SIZE: usize = 50 * 1024 * 1024;

/// Text download seam used by providers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HttpSource: Send + Sync {
    /// Fetch `url` and return the body, or an empty string on any failure.
    async fn get_text(&self, url: &str) -> String;
}

/// HTTP client for fetching lists
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    max_body_bytes: usize,
    /// Cumulative download size tracker (shared by concurrent provider fetches)
    total_downloaded: AtomicUsize,
}

impl Fetcher {
    /// Create a new fetcher from HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("geoipgen/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            max_retries: config.max_retries,
            max_body_bytes: config.max_body_bytes,
            total_downloaded: AtomicUsize::new(0),
        })
    }

    /// Get the total bytes downloaded so far
    pub fn total_downloaded(&self) -> usize {
        self.total_downloaded.load(Ordering::Relaxed)
    }

    /// Fetch content with optional retries and size validation
    async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = RETRY_DELAY_MS * (1 << (attempt - 1).min(5));
                debug!("Retry {} after {}ms for {}", attempt, delay, url);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.client.get(url).send().await {
                Ok(mut response) => {
                    if !response.status().is_success() {
                        last_error = Some(anyhow::anyhow!("HTTP {}", response.status()));
                        continue;
                    }

                    if let Some(content_length) = response.content_length() {
                        self.check_size(content_length as usize)?;
                    }

                    // Content-Length is optional; enforce the limit while streaming
                    let mut bytes = Vec::new();
                    while let Some(chunk) = response
                        .chunk()
                        .await
                        .context("Failed to read response body")?
                    {
                        self.append_chunk(&mut bytes, &chunk)?;
                    }
                    let body =
                        String::from_utf8(bytes).context("Response body is not valid UTF-8")?;

                    let new_total = self
                        .total_downloaded
                        .fetch_add(body.len(), Ordering::Relaxed)
                        + body.len();
                    if new_total > MAX_TOTAL_SIZE {
                        anyhow::bail!(
                            "Cumulative download limit exceeded: {} (max: {})",
                            format_bytes(new_total as u64),
                            format_bytes(MAX_TOTAL_SIZE as u64)
                        );
                    }

                    debug!("Downloaded {} from {}", format_bytes(body.len() as u64), url);
                    return Ok(body);
                }
                Err(e) => {
                    last_error = Some(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown error")))
    }

    /// Grow `body` by `chunk`, refusing to go past the size limits
    fn append_chunk(&self, body: &mut Vec<u8>, chunk: &[u8]) -> Result<()> {
        self.check_size(body.len() + chunk.len())?;
        body.extend_from_slice(chunk);
        Ok(())
    }

    /// Reject a response that is too large on its own or for the run budget
    fn check_size(&self, len: usize) -> Result<()> {
        if len > self.max_body_bytes {
            anyhow::bail!(
                "Response too large: {} (max: {})",
                format_bytes(len as u64),
                format_bytes(self.max_body_bytes as u64)
            );
        }
        let current_total = self.total_downloaded.load(Ordering::Relaxed);
        if current_total + len > MAX_TOTAL_SIZE {
            anyhow::bail!(
                "Cumulative download limit exceeded: {} + {} > {}",
                format_bytes(current_total as u64),
                format_bytes(len as u64),
                format_bytes(MAX_TOTAL_SIZE as u64)
            );
        }
        Ok(())
    }
}

#[async_trait]
impl HttpSource for Fetcher {
    async fn get_text(&self, url: &str) -> String {
        match self.fetch_with_retry(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to fetch {}: {:#}", url, e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(max_body_bytes: usize) -> Fetcher {
        Fetcher::new(&HttpConfig {
            timeout_secs: 1,
            max_retries: 0,
            max_body_bytes,
        })
        .unwrap()
    }

    #[test]
    fn test_check_size_within_limits() {
        let f = fetcher(1024);
        assert!(f.check_size(1024).is_ok());
        assert_eq!(f.total_downloaded(), 0);
    }

    #[test]
    fn test_check_size_body_limit() {
        let f = fetcher(1024);
        let err = f.check_size(1025).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_check_size_cumulative_limit() {
        let f = fetcher(usize::MAX);
        f.total_downloaded.store(MAX_TOTAL_SIZE, Ordering::Relaxed);
        let err = f.check_size(1).unwrap_err();
        assert!(err.to_string().contains("Cumulative"));
    }

    #[test]
    fn test_append_chunk_stops_at_body_limit() {
        let f = fetcher(8);
        let mut body = Vec::new();
        f.append_chunk(&mut body, b"10.0.").unwrap();
        f.append_chunk(&mut body, b"0.0").unwrap();
        assert_eq!(body, b"10.0.0.0");

        let err = f.append_chunk(&mut body, b"/8").unwrap_err();
        assert!(err.to_string().contains("too large"));
        // Nothing past the limit is buffered
        assert_eq!(body.len(), 8);
    }

    #[tokio::test]
    async fn test_get_text_invalid_url_is_empty() {
        let f = fetcher(1024);
        assert_eq!(f.get_text("not-a-url").await, "");
    }

    #[tokio::test]
    async fn test_mock_http_source() {
        let mut mock = MockHttpSource::new();
        mock.expect_get_text()
            .withf(|url| url.ends_with("example.com/list.txt"))
            .times(1)
            .returning(|_| "10.0.0.0/8\n".to_string());
        assert_eq!(mock.get_text("https://example.com/list.txt").await, "10.0.0.0/8\n");
    }
}
