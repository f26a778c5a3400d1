//! Local list files: one group per file, one range per line.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::validation::canonical_group_name;

/// A list file turned into a named group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFile {
    pub name: String,
    pub ranges: Vec<String>,
}

/// Result of a best-effort directory walk
#[derive(Debug, Default)]
pub struct DirScan {
    /// Group name -> raw ranges
    pub groups: BTreeMap<String, Vec<String>>,
    /// Problems hit during the walk; none of them stopped it
    pub errors: Vec<anyhow::Error>,
}

/// Split a list body into entries.
///
/// Everything from `#` to end of line is a comment; whitespace is trimmed and
/// blank lines are dropped. Entries are not validated here.
pub fn parse_plain_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        })
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load one list file. The group name is the upper-cased file name.
pub fn load_list_file(path: &Path) -> Result<ListFile> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("List file has no usable name: {:?}", path))?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read list file: {:?}", path))?;

    Ok(ListFile {
        name: canonical_group_name(file_name),
        ranges: parse_plain_list(&content),
    })
}

/// Walk `dir` recursively and load every list file in it.
///
/// Files are visited in file-name order; when two files map to the same
/// group the later one replaces the earlier. Hidden files and directories
/// (`.git/`) are not visited; symlinks are followed. A file with no entries
/// still yields an empty group. Errors are collected and logged, and the walk
/// carries on.
pub fn load_list_dir(dir: &Path) -> DirScan {
    let mut scan = DirScan::default();

    if !dir.exists() {
        info!("No list directory at {:?}, skipping local lists", dir);
        return scan;
    }

    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to walk list directory: {}", e);
                scan.errors.push(e.into());
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match load_list_file(entry.path()) {
            Ok(list) => {
                debug!(
                    "Loaded {} entries for {} from {:?}",
                    list.ranges.len(),
                    list.name,
                    entry.path()
                );
                if scan.groups.insert(list.name.clone(), list.ranges).is_some() {
                    debug!("{} redefined by {:?}", list.name, entry.path());
                }
            }
            Err(e) => {
                warn!("Failed to load list file: {:#}", e);
                scan.errors.push(e);
            }
        }
    }

    scan
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
