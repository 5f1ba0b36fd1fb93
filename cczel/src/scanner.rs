//! Source tree scanning
//!
//! Walks every include root one directory level at a time, skipping
//! exclusion roots, and collects compilation units by extension.

use crate::config::Configuration;
use crate::error::BuildError;
use crate::fs::{EntryKind, FileSystem};
use crate::path;
use crate::Result;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Find every compilation unit under the configured include roots.
///
/// Overlapping include roots do not yield duplicates. The order of the
/// result follows directory listing order and must not be relied upon.
pub fn scan_sources<F: FileSystem + ?Sized>(fs: &F, config: &Configuration) -> Result<Vec<String>> {
    let mut sources = Vec::new();
    let mut seen = HashSet::new();

    for root in &config.include_roots {
        scan_dir(fs, config, root, &mut sources, &mut seen)?;
    }

    info!(
        "Found {} compilation units in {} include roots",
        sources.len(),
        config.include_roots.len()
    );
    Ok(sources)
}

fn scan_dir<F: FileSystem + ?Sized>(
    fs: &F,
    config: &Configuration,
    dir: &str,
    sources: &mut Vec<String>,
    seen: &mut HashSet<String>,
) -> Result<()> {
    if config.is_excluded_root(dir) {
        debug!("Skipping excluded directory {}", display_dir(dir));
        return Ok(());
    }

    let entries = fs
        .list_dir(dir)
        .map_err(|source| BuildError::DirectoryUnreadable {
            path: display_dir(dir).to_string(),
            source,
        })?;

    for entry in entries {
        if !path::is_recordable(&entry.name) {
            warn!("Not tracking {}{:?}: line breaks in file names are unsupported", dir, entry.name);
            continue;
        }
        match entry.kind {
            EntryKind::Directory => {
                let subdir = format!("{dir}{}/", entry.name);
                scan_dir(fs, config, &subdir, sources, seen)?;
            }
            EntryKind::File if config.is_source_file(&entry.name) => {
                let path = format!("{dir}{}", entry.name);
                if seen.insert(path.clone()) {
                    debug!("Found compilation unit {}", path);
                    sources.push(path);
                }
            }
            EntryKind::File => {}
        }
    }

    Ok(())
}

fn display_dir(dir: &str) -> &str {
    if dir.is_empty() { "." } else { dir }
}
