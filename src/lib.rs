//! # geoipgen - GeoIP dataset builder
//!
//! Builds the country-to-network dataset loaded by V2Ray-style routers from a
//! GeoLite2-style CSV export, local list files and online range lists
//! published by service operators (Telegram, Cloudflare, GitHub...).
//!
//! ## Features
//!
//! - **Pluggable Providers** - One provider per external list, registered by name
//! - **Concurrent Fetching** - Providers run in parallel, each bounded by a timeout
//! - **Fault Isolation** - A failing provider yields an empty group, never a failed run
//! - **CIDR Merging** - Overlapping and adjacent ranges collapse to a minimal set
//! - **Local Lists** - Any file under the data directory becomes a group
//! - **Atomic Output** - Protobuf `geoip.dat` or JSON, written via temp file + rename
//! - **Download Limits** - Responses are size-limited (10MB/response, 50MB total)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       geoipgen                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: build, providers list, providers fetch     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! │    └── Built-in provider toggles, custom providers          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Registry (futures + tokio)                                 │
//! │    └── SourceProvider trait                                 │
//! │          ├── UrlListProvider (Telegram, Cloudflare, custom) │
//! │          ├── JSON feeds (GitHub, Google Cloud, AWS, Fastly) │
//! │          └── StaticProvider (inline ranges)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fetcher (reqwest + rustls)                                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Loader (csv + walkdir)                                     │
//! │    ├── Country tables and block files                       │
//! │    └── Supplementary list directory                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pipeline + CIDR merger (ipnet)                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Output (prost, serde_json)                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use geoipgen::config::Config;
//! use geoipgen::fetcher::Fetcher;
//! use geoipgen::output::writer_for;
//! use geoipgen::pipeline::{Pipeline, StaticInputs};
//! use geoipgen::registry::ProviderRegistry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_or_default("geoipgen.yaml")?;
//!
//!     // Providers share one HTTP client
//!     let fetcher = Arc::new(Fetcher::new(&config.http)?);
//!     let registry = ProviderRegistry::from_config(&config, fetcher)?;
//!
//!     let inputs = StaticInputs {
//!         country_codes: PathBuf::from("GeoLite2-Country-Locations-en.csv"),
//!         ipv4_blocks: PathBuf::from("GeoLite2-Country-Blocks-IPv4.csv"),
//!         ipv6_blocks: PathBuf::from("GeoLite2-Country-Blocks-IPv6.csv"),
//!         data_dir: Some(config.data_dir.clone()),
//!     };
//!     let result = Pipeline::from_config(&registry, &config).run(&inputs).await?;
//!
//!     writer_for(config.output.format).write(&result, &config.output.path)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`cidr`] - Range parsing, merging and address counting
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`error`] - Typed errors
//! - [`fetcher`] - HTTP client for downloading lists
//! - [`loader`] - CSV tables and local list files
//! - [`output`] - `dat` and JSON writers
//! - [`pipeline`] - Aggregation of all sources into the final dataset
//! - [`provider`] - Online list providers
//! - [`registry`] - Provider registry and concurrent fetch
//! - [`utils`] - Formatting helpers
//! - [`validation`] - Name folding and URL checks

pub mod cidr;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod utils;
pub mod validation;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::GeoipError;
