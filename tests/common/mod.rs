//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const LOCATIONS: &str = "\
geoname_id,locale_code,continent_code,continent_name,country_iso_code,country_name,is_in_european_union
1,en,NA,North America,US,United States,0
2,en,EU,Europe,de,Germany,1
6255148,en,EU,Europe,,,0
";

pub const BLOCKS_V4: &str = "\
network,geoname_id,registered_country_geoname_id,represented_country_geoname_id,is_anonymous_proxy,is_satellite_provider
1.2.3.0/24,1,1,,0,0
5.6.0.0/17,2,2,,0,0
5.6.128.0/17,2,2,,0,0
9.9.9.0/24,999,999,,0,0
";

pub const BLOCKS_V6: &str = "\
network,geoname_id,registered_country_geoname_id,represented_country_geoname_id,is_anonymous_proxy,is_satellite_provider
2001:db8::/32,1,1,,0,0
";

/// GeoLite2-style tables in a temporary directory
pub struct Fixture {
    pub dir: TempDir,
    pub country: PathBuf,
    pub ipv4: PathBuf,
    pub ipv6: PathBuf,
    pub data_dir: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let country = write(dir.path(), "locations.csv", LOCATIONS);
        let ipv4 = write(dir.path(), "blocks-v4.csv", BLOCKS_V4);
        let ipv6 = write(dir.path(), "blocks-v6.csv", BLOCKS_V6);
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        Self {
            dir,
            country,
            ipv4,
            ipv6,
            data_dir,
        }
    }

    /// Add a supplementary list file
    pub fn list(&self, name: &str, content: &str) -> PathBuf {
        write(&self.data_dir, name, content)
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}
