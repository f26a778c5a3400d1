//! Online range-list providers.
//!
//! A provider knows how to obtain the raw ranges for exactly one group (one
//! external service). [`SourceProvider::fetch_and_merge`] turns that raw list
//! into a clean, merged IPv4 set and never fails: every problem is logged and
//! degrades to an empty group so that one bad source cannot stop the run.

mod cloud;
mod inline;
mod plain;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

pub use cloud::{AwsProvider, FastlyProvider, GithubProvider, GoogleCloudProvider};
pub use inline::StaticProvider;
pub use plain::{UrlListProvider, CLOUDFLARE_URL, TELEGRAM_URL};

use crate::cidr::{merge, parse_range};
use crate::validation::looks_like_ipv6;

/// What to do with entries that are not valid ranges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Log and drop the entry, keep the rest of the list
    #[default]
    SkipEntry,
    /// Any malformed entry empties the provider's whole group
    DropGroup,
}

impl MalformedPolicy {
    pub fn from_flag(drop_group_on_malformed: bool) -> Self {
        if drop_group_on_malformed {
            MalformedPolicy::DropGroup
        } else {
            MalformedPolicy::SkipEntry
        }
    }
}

/// A named source of ranges for one group
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Stable, non-empty name; used as the registry key
    fn name(&self) -> &str;

    /// Raw, unvalidated range strings from the backing source
    async fn fetch_raw(&self) -> Result<Vec<String>>;

    /// Fetch, filter to IPv4 and merge
    async fn fetch_and_merge(&self, policy: MalformedPolicy) -> Vec<String> {
        match self.fetch_raw().await {
            Ok(raw) => clean_and_merge(self.name(), &raw, policy),
            Err(e) => {
                warn!("[{}] fetch error: {:#}", self.name(), e);
                Vec::new()
            }
        }
    }
}

/// Trim, drop blanks and IPv6 entries, then merge.
///
/// Merge failures are reported under the provider's name and yield an empty
/// list.
pub fn clean_and_merge(name: &str, raw: &[String], policy: MalformedPolicy) -> Vec<String> {
    let mut skipped_v6 = 0usize;
    let mut candidates: Vec<&str> = raw
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .filter(|entry| {
            let v6 = looks_like_ipv6(entry);
            if v6 {
                skipped_v6 += 1;
            }
            !v6
        })
        .collect();

    if skipped_v6 > 0 {
        debug!("[{}] ignored {} IPv6 entries", name, skipped_v6);
    }

    if policy == MalformedPolicy::SkipEntry {
        candidates.retain(|entry| match parse_range(entry) {
            Ok(_) => true,
            Err(e) => {
                warn!("[{}] skipping entry: {}", name, e);
                false
            }
        });
    }

    match merge(&candidates) {
        Ok(merged) => {
            debug!(
                "[{}] {} entries merged into {} ranges",
                name,
                candidates.len(),
                merged.len()
            );
            merged
        }
        Err(e) => {
            warn!("[{}] merge error : {}", name, e);
            Vec::new()
        }
    }
}
