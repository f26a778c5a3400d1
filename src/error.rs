//! Error types for geoipgen.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoipError {
    #[error("Invalid address range: {0}")]
    InvalidRange(String),

    #[error("Provider name must not be empty")]
    EmptyProviderName,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Group '{group}' contains an invalid range: {range}")]
    InvalidGroupRange { group: String, range: String },
}
