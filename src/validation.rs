//! Centralized validation and normalization helpers.
//!
//! This module provides:
//! - Group and provider name folding
//! - Source URL validation
//! - Address-family filtering for provider input

use anyhow::{bail, Result};

/// Fold a group name to its canonical output form (trimmed, upper-case).
///
/// # Examples
/// ```
/// use geoipgen::validation::canonical_group_name;
/// assert_eq!(canonical_group_name(" us "), "US");
/// assert_eq!(canonical_group_name("telegram"), "TELEGRAM");
/// ```
pub fn canonical_group_name(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// Fold a provider name to its registry key (trimmed, ASCII lower-case).
///
/// Folding is ASCII-only so that a key and the group name derived from it
/// agree on which characters change case.
///
/// # Examples
/// ```
/// use geoipgen::validation::provider_key;
/// assert_eq!(provider_key("Telegram"), "telegram");
/// assert_eq!(provider_key("   "), "");
/// ```
pub fn provider_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Simple address-family filter: anything with a colon is treated as IPv6.
///
/// # Examples
/// ```
/// use geoipgen::validation::looks_like_ipv6;
/// assert!(looks_like_ipv6("2001:db8::/32"));
/// assert!(!looks_like_ipv6("10.0.0.0/8"));
/// ```
pub fn looks_like_ipv6(range: &str) -> bool {
    range.contains(':')
}

/// Validate a source URL.
///
/// # Errors
/// Returns an error if the URL is empty or does not use HTTPS.
///
/// # Examples
/// ```
/// use geoipgen::validation::validate_source_url;
/// assert!(validate_source_url("https://example.com/list.txt").is_ok());
/// assert!(validate_source_url("http://example.com/list.txt").is_err());
/// ```
pub fn validate_source_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        bail!("Source URL cannot be empty");
    }
    if !url.starts_with("https://") {
        bail!("Source URL must use HTTPS: {}", url);
    }
    if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        bail!("Source URL contains whitespace or control characters: {:?}", url);
    }
    Ok(())
}
