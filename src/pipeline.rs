//! Aggregation pipeline.
//!
//! ```text
//! country table + block files ──► base groups ─────────────────────┐
//! list directory ──► accumulator ◄── registry.fetch_all()          ├─► AggregateResult
//!                        └──── convert (fatal on bad range) ───────┘
//! ```
//!
//! Group names are folded to upper case as they enter the accumulator, so a
//! country code, a list file and a provider can all contribute to one group.

use anyhow::{Context, Result};
use ipnet::IpNet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::cidr::{count_addresses, merge_nets, parse_range};
use crate::config::{CollisionPolicy, Config};
use crate::error::GeoipError;
use crate::loader::{load_blocks, load_country_codes, load_list_dir, BaseGroups};
use crate::registry::{FetchOptions, ProviderRegistry};
use crate::utils::{format_addresses, format_count};
use crate::validation::canonical_group_name;

/// Raw, not yet validated groups
pub type RawGroups = BTreeMap<String, Vec<String>>;

/// Required GeoIP tables plus the optional list directory
#[derive(Debug, Clone)]
pub struct StaticInputs {
    pub country_codes: PathBuf,
    pub ipv4_blocks: PathBuf,
    pub ipv6_blocks: PathBuf,
    pub data_dir: Option<PathBuf>,
}

/// One output entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub ranges: Vec<IpNet>,
}

/// Final dataset handed to the output writer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub groups: Vec<Group>,
}

impl AggregateResult {
    /// First entry with this name
    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_ranges(&self) -> usize {
        self.groups.iter().map(|g| g.ranges.len()).sum()
    }

    /// Addresses covered, counted per group
    pub fn total_addresses(&self) -> u128 {
        self.groups
            .iter()
            .map(|g| count_addresses(&g.ranges))
            .fold(0u128, u128::saturating_add)
    }
}

pub struct Pipeline<'a> {
    registry: &'a ProviderRegistry,
    fetch: FetchOptions,
    collision: CollisionPolicy,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a ProviderRegistry, fetch: FetchOptions, collision: CollisionPolicy) -> Self {
        Self {
            registry,
            fetch,
            collision,
        }
    }

    pub fn from_config(registry: &'a ProviderRegistry, config: &Config) -> Self {
        Self::new(
            registry,
            FetchOptions::from_config(&config.providers),
            config.collision,
        )
    }

    /// Run the whole pass. Only required inputs and malformed ranges fail it.
    pub async fn run(&self, inputs: &StaticInputs) -> Result<AggregateResult> {
        info!("Loading GeoIP tables...");
        let base = load_base(inputs)?;
        info!(
            "Base dataset: {} countries, {} networks",
            base.len(),
            format_count(base.values().map(Vec::len).sum())
        );

        let mut extra = RawGroups::new();
        if let Some(dir) = &inputs.data_dir {
            let scan = load_list_dir(dir);
            if !scan.errors.is_empty() {
                warn!(
                    "{} problem(s) while reading {:?}, continuing with {} list(s)",
                    scan.errors.len(),
                    dir,
                    scan.groups.len()
                );
            }
            extra.extend(scan.groups);
        }

        if self.registry.is_empty() {
            debug!("No providers registered");
        } else {
            info!("Fetching {} online list(s)...", self.registry.len());
            let dynamic = self.registry.fetch_all(&self.fetch).await;
            fold_dynamic(&mut extra, dynamic, self.collision);
        }

        let converted = convert_groups(&extra)?;
        let result = combine(base, converted, self.collision);

        info!(
            "Aggregated {} groups, {} ranges ({} addresses)",
            result.len(),
            format_count(result.total_ranges()),
            format_addresses(result.total_addresses())
        );
        Ok(result)
    }
}

/// Join the country table against both block files.
pub fn load_base(inputs: &StaticInputs) -> Result<BaseGroups> {
    let codes = load_country_codes(&inputs.country_codes)
        .context("Error reading country code map")?;

    let mut groups = BaseGroups::new();
    load_blocks(&inputs.ipv4_blocks, &codes, &mut groups).context("Error loading IPv4 file")?;
    load_blocks(&inputs.ipv6_blocks, &codes, &mut groups).context("Error loading IPv6 file")?;
    Ok(groups)
}

/// Fold provider results into the accumulator under upper-cased names.
pub fn fold_dynamic(acc: &mut RawGroups, dynamic: RawGroups, policy: CollisionPolicy) {
    for (name, ranges) in dynamic {
        let name = canonical_group_name(&name);
        match policy {
            CollisionPolicy::Union => acc.entry(name).or_default().extend(ranges),
            CollisionPolicy::Append => {
                if acc.insert(name.clone(), ranges).is_some() {
                    debug!("Online list {} replaces local list", name);
                }
            }
        }
    }
}

/// Parse every range of every group; any invalid range is fatal.
pub fn convert_groups(groups: &RawGroups) -> Result<BaseGroups, GeoipError> {
    groups
        .iter()
        .map(|(name, ranges)| {
            let nets = ranges
                .iter()
                .map(|r| {
                    parse_range(r).map_err(|_| GeoipError::InvalidGroupRange {
                        group: name.clone(),
                        range: r.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((name.clone(), nets))
        })
        .collect()
}

/// Combine extra groups into the base dataset.
///
/// `Union` yields one merged entry per name and drops groups left empty;
/// `Append` keeps every entry as loaded, repeated names included.
pub fn combine(base: BaseGroups, extra: BaseGroups, policy: CollisionPolicy) -> AggregateResult {
    match policy {
        CollisionPolicy::Union => {
            let mut all = base;
            for (name, nets) in extra {
                all.entry(name).or_default().extend(nets);
            }

            let groups = all
                .into_iter()
                .filter_map(|(name, nets)| {
                    let ranges = merge_nets(&nets);
                    if ranges.is_empty() {
                        warn!("Group {} has no ranges, omitted", name);
                        return None;
                    }
                    debug!(
                        "{}: {} -> {} ranges ({} addresses)",
                        name,
                        nets.len(),
                        ranges.len(),
                        format_addresses(count_addresses(&ranges))
                    );
                    Some(Group { name, ranges })
                })
                .collect();
            AggregateResult { groups }
        }
        CollisionPolicy::Append => {
            let groups = base
                .into_iter()
                .chain(extra)
                .map(|(name, ranges)| Group { name, ranges })
                .collect();
            AggregateResult { groups }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nets(list: &[&str]) -> Vec<IpNet> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn raw(entries: &[(&str, &[&str])]) -> RawGroups {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_fold_dynamic_union() {
        let mut acc = raw(&[("TELEGRAM", &["91.108.4.0/22"])]);
        fold_dynamic(
            &mut acc,
            raw(&[("telegram", &["91.108.8.0/22"]), ("alpha", &["10.0.0.0/8"])]),
            CollisionPolicy::Union,
        );
        assert_eq!(acc["TELEGRAM"], vec!["91.108.4.0/22", "91.108.8.0/22"]);
        assert_eq!(acc["ALPHA"], vec!["10.0.0.0/8"]);
    }

    #[test]
    fn test_fold_dynamic_append_replaces() {
        let mut acc = raw(&[("TELEGRAM", &["91.108.4.0/22"])]);
        fold_dynamic(
            &mut acc,
            raw(&[("telegram", &["91.108.8.0/22"])]),
            CollisionPolicy::Append,
        );
        assert_eq!(acc["TELEGRAM"], vec!["91.108.8.0/22"]);
    }

    #[test]
    fn test_convert_groups_invalid_is_fatal() {
        let groups = raw(&[("OFFICE", &["10.1.0.0/16", "10.300.0.0/16"])]);
        let err = convert_groups(&groups).unwrap_err();
        match err {
            GeoipError::InvalidGroupRange { group, range } => {
                assert_eq!(group, "OFFICE");
                assert_eq!(range, "10.300.0.0/16");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_convert_groups_normalizes() {
        let converted = convert_groups(&raw(&[("X", &["10.1.2.3/8", "8.8.8.8"])])).unwrap();
        assert_eq!(converted["X"], nets(&["10.0.0.0/8", "8.8.8.8/32"]));
    }

    #[test]
    fn test_combine_union_single_entry() {
        let mut base = BaseGroups::new();
        base.insert("US".into(), nets(&["1.2.3.0/25", "1.2.3.128/25"]));
        base.insert("TELEGRAM".into(), nets(&["91.108.4.0/22"]));
        let mut extra = BaseGroups::new();
        extra.insert("TELEGRAM".into(), nets(&["91.108.4.0/23", "149.154.160.0/20"]));

        let result = combine(base, extra, CollisionPolicy::Union);
        assert_eq!(result.names(), vec!["TELEGRAM", "US"]);
        assert_eq!(
            result.get("TELEGRAM").unwrap().ranges,
            nets(&["91.108.4.0/22", "149.154.160.0/20"])
        );
        assert_eq!(result.get("US").unwrap().ranges, nets(&["1.2.3.0/24"]));
    }

    #[test]
    fn test_combine_union_drops_empty_groups() {
        let mut extra = BaseGroups::new();
        extra.insert("BROKEN".into(), Vec::new());
        let result = combine(BaseGroups::new(), extra, CollisionPolicy::Union);
        assert!(result.is_empty());
    }

    #[test]
    fn test_combine_append_duplicates_name() {
        let mut base = BaseGroups::new();
        base.insert("TELEGRAM".into(), nets(&["91.108.4.0/22"]));
        let mut extra = BaseGroups::new();
        extra.insert("TELEGRAM".into(), nets(&["91.108.8.0/22"]));

        let result = combine(base, extra, CollisionPolicy::Append);
        assert_eq!(result.names(), vec!["TELEGRAM", "TELEGRAM"]);
        assert_eq!(result.total_ranges(), 2);
        assert_eq!(result.get("TELEGRAM").unwrap().ranges, nets(&["91.108.4.0/22"]));
    }
}
