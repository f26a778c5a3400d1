//! Output writers.
//!
//! The `dat` format is the protobuf `GeoIPList` consumed by V2Ray-style
//! routers; `json` is a readable dump of the same groups.

use anyhow::{Context, Result};
use chrono::Utc;
use ipnet::IpNet;
use prost::Message;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::OutputFormat;
use crate::pipeline::{AggregateResult, Group};
use crate::utils::format_bytes;

/// `CIDR { bytes ip = 1; uint32 prefix = 2; }`
#[derive(Clone, PartialEq, Message)]
pub struct Cidr {
    #[prost(bytes = "vec", tag = "1")]
    pub ip: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub prefix: u32,
}

/// `GeoIP { string country_code = 1; repeated CIDR cidr = 2; bool reverse_match = 3; }`
#[derive(Clone, PartialEq, Message)]
pub struct GeoIp {
    #[prost(string, tag = "1")]
    pub country_code: String,
    #[prost(message, repeated, tag = "2")]
    pub cidr: Vec<Cidr>,
    #[prost(bool, tag = "3")]
    pub reverse_match: bool,
}

/// `GeoIPList { repeated GeoIP entry = 1; }`
#[derive(Clone, PartialEq, Message)]
pub struct GeoIpList {
    #[prost(message, repeated, tag = "1")]
    pub entry: Vec<GeoIp>,
}

impl From<&IpNet> for Cidr {
    fn from(net: &IpNet) -> Self {
        let ip = match net {
            IpNet::V4(v4) => v4.network().octets().to_vec(),
            IpNet::V6(v6) => v6.network().octets().to_vec(),
        };
        Cidr {
            ip,
            prefix: u32::from(net.prefix_len()),
        }
    }
}

impl From<&AggregateResult> for GeoIpList {
    fn from(result: &AggregateResult) -> Self {
        GeoIpList {
            entry: result
                .groups
                .iter()
                .map(|group| GeoIp {
                    country_code: group.name.clone(),
                    cidr: group.ranges.iter().map(Cidr::from).collect(),
                    reverse_match: false,
                })
                .collect(),
        }
    }
}

/// Serializes an [`AggregateResult`] and persists it
pub trait OutputWriter {
    fn encode(&self, result: &AggregateResult) -> Result<Vec<u8>>;

    /// Encode and write atomically; the target is never left half-written.
    fn write(&self, result: &AggregateResult, path: &Path) -> Result<()> {
        let bytes = self.encode(result)?;
        write_atomic(path, &bytes)?;
        info!(
            "Wrote {} groups to {:?} ({})",
            result.len(),
            path,
            format_bytes(bytes.len() as u64)
        );
        Ok(())
    }
}

pub struct GeoIpDatWriter;

impl OutputWriter for GeoIpDatWriter {
    fn encode(&self, result: &AggregateResult) -> Result<Vec<u8>> {
        Ok(GeoIpList::from(result).encode_to_vec())
    }
}

pub struct JsonWriter;

#[derive(Serialize)]
struct JsonDocument<'a> {
    generated_at: String,
    groups: &'a [Group],
}

impl OutputWriter for JsonWriter {
    fn encode(&self, result: &AggregateResult) -> Result<Vec<u8>> {
        let doc = JsonDocument {
            generated_at: Utc::now().to_rfc3339(),
            groups: &result.groups,
        };
        serde_json::to_vec_pretty(&doc).context("Failed to serialize JSON output")
    }
}

pub fn writer_for(format: OutputFormat) -> Box<dyn OutputWriter> {
    match format {
        OutputFormat::Dat => Box::new(GeoIpDatWriter),
        OutputFormat::Json => Box::new(JsonWriter),
    }
}

/// Temp file in the target directory, synced, then renamed over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut temp_file = NamedTempFile::new_in(parent_dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", parent_dir))?;

    temp_file.write_all(bytes)?;
    temp_file.as_file().sync_all()?;

    temp_file
        .persist(path)
        .with_context(|| format!("Failed to persist output file: {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> AggregateResult {
        AggregateResult {
            groups: vec![
                Group {
                    name: "TELEGRAM".into(),
                    ranges: vec!["91.108.4.0/22".parse().unwrap()],
                },
                Group {
                    name: "US".into(),
                    ranges: vec![
                        "1.2.3.0/24".parse().unwrap(),
                        "2001:db8::/32".parse().unwrap(),
                    ],
                },
            ],
        }
    }

    #[test]
    fn test_cidr_from_ipnet() {
        let v4 = Cidr::from(&"1.2.3.0/24".parse::<IpNet>().unwrap());
        assert_eq!(v4.ip, vec![1, 2, 3, 0]);
        assert_eq!(v4.prefix, 24);

        let v6 = Cidr::from(&"2001:db8::/32".parse::<IpNet>().unwrap());
        assert_eq!(v6.ip.len(), 16);
        assert_eq!(&v6.ip[..4], &[0x20, 0x01, 0x0d, 0xb8]);
        assert_eq!(v6.prefix, 32);
    }

    #[test]
    fn test_dat_decodes_back() {
        let bytes = GeoIpDatWriter.encode(&sample()).unwrap();
        let list = GeoIpList::decode(bytes.as_slice()).unwrap();

        assert_eq!(list.entry.len(), 2);
        assert_eq!(list.entry[0].country_code, "TELEGRAM");
        assert_eq!(list.entry[0].cidr[0].ip, vec![91, 108, 4, 0]);
        assert_eq!(list.entry[1].country_code, "US");
        assert_eq!(list.entry[1].cidr.len(), 2);
        assert!(!list.entry[1].reverse_match);
    }

    #[test]
    fn test_dat_keeps_duplicate_entries() {
        let mut result = sample();
        result.groups.push(Group {
            name: "TELEGRAM".into(),
            ranges: vec!["91.108.8.0/22".parse().unwrap()],
        });
        let bytes = GeoIpDatWriter.encode(&result).unwrap();
        let list = GeoIpList::decode(bytes.as_slice()).unwrap();
        let telegram = list
            .entry
            .iter()
            .filter(|e| e.country_code == "TELEGRAM")
            .count();
        assert_eq!(telegram, 2);
    }

    #[test]
    fn test_json_document() {
        let bytes = JsonWriter.encode(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert!(value["generated_at"].is_string());
        assert_eq!(value["groups"][0]["name"], "TELEGRAM");
        assert_eq!(value["groups"][0]["ranges"][0], "91.108.4.0/22");
        assert_eq!(value["groups"][1]["ranges"][1], "2001:db8::/32");
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geoip.dat");
        std::fs::write(&path, b"stale").unwrap();

        writer_for(OutputFormat::Dat).write(&sample(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(GeoIpList::decode(bytes.as_slice()).unwrap().entry.len(), 2);
        // Only the output itself, no leftover temp files
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent").join("geoip.dat");
        assert!(writer_for(OutputFormat::Json).write(&sample(), &path).is_err());
        assert!(!path.exists());
    }
}
