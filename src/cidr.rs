//! CIDR parsing and canonical merging.
//!
//! Interval math is delegated to [`ipnet`]; this module only adds the string
//! boundary (parsing, host-bit normalization) the rest of the crate needs.

use ipnet::IpNet;
use std::net::IpAddr;

use crate::error::GeoipError;

/// Parse a single address range.
///
/// Accepts CIDR notation or a bare address (treated as a host route). Host
/// bits are cleared, so `10.1.2.3/8` becomes `10.0.0.0/8`.
pub fn parse_range(input: &str) -> Result<IpNet, GeoipError> {
    let trimmed = input.trim();
    let net = if trimmed.contains('/') {
        trimmed.parse::<IpNet>().ok()
    } else {
        trimmed.parse::<IpAddr>().ok().map(IpNet::from)
    };
    net.map(|n| n.trunc())
        .ok_or_else(|| GeoipError::InvalidRange(trimmed.to_string()))
}

/// Merge a list of ranges into the minimal set of non-overlapping networks.
///
/// Duplicates and contained ranges disappear, adjacent ranges are joined.
/// Both families may be mixed; the result is sorted IPv4 first.
pub fn merge_nets(nets: &[IpNet]) -> Vec<IpNet> {
    let truncated: Vec<IpNet> = nets.iter().map(IpNet::trunc).collect();
    IpNet::aggregate(&truncated)
}

/// Merge a list of range strings.
///
/// Fails on the first entry that does not parse; nothing is returned for the
/// valid entries in that case.
pub fn merge<S: AsRef<str>>(ranges: &[S]) -> Result<Vec<String>, GeoipError> {
    let nets = ranges
        .iter()
        .map(|r| parse_range(r.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(merge_nets(&nets).iter().map(IpNet::to_string).collect())
}

/// Total number of individual addresses covered by a list of networks.
///
/// Saturates instead of overflowing on `::/0`.
pub fn count_addresses(nets: &[IpNet]) -> u128 {
    nets.iter()
        .map(|net| {
            let shift = net.max_prefix_len() - net.prefix_len();
            if shift >= 128 {
                u128::MAX
            } else {
                1u128 << shift
            }
        })
        .fold(0u128, |acc, count| acc.saturating_add(count))
}
