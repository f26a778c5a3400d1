//! CLI command implementations.

pub mod build;
pub mod providers;
