//! GeoLite2-style country CSV files.
//!
//! The location table maps a numeric id to an ISO country code (column 0 and
//! column 4); block files map a network (column 0) to an id (column 1). The
//! first row of every file is a header.

use anyhow::{Context, Result};
use csv::StringRecord;
use ipnet::IpNet;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

use crate::cidr::parse_range;
use crate::error::GeoipError;
use crate::validation::canonical_group_name;

const LOCATION_ID_COLUMN: usize = 0;
const LOCATION_CODE_COLUMN: usize = 4;
const BLOCK_NETWORK_COLUMN: usize = 0;
const BLOCK_ID_COLUMN: usize = 1;

/// Location id -> upper-case country code
pub type CountryCodes = HashMap<String, String>;

/// Country code -> networks
pub type BaseGroups = BTreeMap<String, Vec<IpNet>>;

fn field<'r>(record: &'r StringRecord, column: usize, path: &Path) -> Result<&'r str, GeoipError> {
    record.get(column).map(str::trim).ok_or_else(|| {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        GeoipError::Parse(format!(
            "{}:{}: missing column {}",
            path.display(),
            line,
            column
        ))
    })
}

/// Read the country location table.
///
/// Rows without a country code (continent-only locations) are skipped.
pub fn load_country_codes(path: &Path) -> Result<CountryCodes> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open country code file: {:?}", path))?;

    let mut codes = CountryCodes::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed CSV in {:?}", path))?;
        let id = field(&record, LOCATION_ID_COLUMN, path)?;
        let code = field(&record, LOCATION_CODE_COLUMN, path)?;
        if code.is_empty() {
            continue;
        }
        codes.insert(id.to_string(), canonical_group_name(code));
    }

    debug!("Loaded {} country codes from {:?}", codes.len(), path);
    Ok(codes)
}

/// Read a block file and append its networks to `groups`.
///
/// Rows whose id is not in `codes` are skipped without comment; a network that
/// does not parse aborts the load.
pub fn load_blocks(path: &Path, codes: &CountryCodes, groups: &mut BaseGroups) -> Result<usize> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open block file: {:?}", path))?;

    let mut loaded = 0usize;
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed CSV in {:?}", path))?;
        let network = field(&record, BLOCK_NETWORK_COLUMN, path)?;
        let id = field(&record, BLOCK_ID_COLUMN, path)?;

        let Some(code) = codes.get(id) else {
            continue;
        };
        let net = parse_range(network).with_context(|| {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            format!("Invalid network in {:?} at line {}", path, line)
        })?;
        groups.entry(code.clone()).or_default().push(net);
        loaded += 1;
    }

    debug!("Loaded {} networks from {:?}", loaded, path);
    Ok(loaded)
}
