//! Include directive parsing and dependency graph construction
//!
//! Only quoted includes are followed (`#include "x.h"`, `# include "x.h"`).
//! Angle-bracket includes name system headers and are ignored, as are
//! includes hidden behind macros.

use crate::config::Configuration;
use crate::error::BuildError;
use crate::fs::FileSystem;
use crate::path;
use crate::state::{BuildState, FileKind};
use crate::Result;
use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static INCLUDE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    // Match: #include "path" or # include "path"
    Regex::new(r#"^\s*#\s*include\s*"([^"]+)""#).expect("include directive regex is valid")
});

/// Extract the quoted include paths of a file, in order of appearance
pub fn parse_includes(content: &str) -> Vec<&str> {
    content
        .lines()
        .filter_map(|line| INCLUDE_DIRECTIVE.captures(line))
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Summary of a graph construction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Tracked compilation units
    pub sources: usize,
    /// Tracked headers
    pub headers: usize,
    /// Include edges
    pub edges: usize,
    /// Include directives dropped because they point into an exclusion root
    pub excluded_includes: usize,
    /// Include cycles found
    pub cycles: usize,
}

/// Build the tracked-file graph from the scanned compilation units.
///
/// The result holds the transitive closure of quoted includes reachable
/// from `sources`, minus everything under an exclusion root.
pub fn build_graph<F: FileSystem + ?Sized>(
    fs: &F,
    config: &Configuration,
    sources: &[String],
) -> Result<(BuildState, GraphStats)> {
    let mut state = BuildState::new();
    let mut stats = GraphStats::default();
    let mut worklist = VecDeque::new();

    for source in sources {
        if config.is_excluded(source) {
            debug!("Not tracking {} (under an exclusion root)", source);
            continue;
        }
        let (id, new) = state.track(source, FileKind::Source);
        if new {
            worklist.push_back(id);
        }
    }

    while let Some(id) = worklist.pop_front() {
        let including = state.file(id)?.path.clone();
        let content = fs
            .read_to_string(&including)
            .map_err(|source| BuildError::FileUnreadable {
                path: including.clone(),
                source,
            })?;

        for include in parse_includes(&content) {
            let resolved = path::resolve_relative(&including, include)?;
            if !path::is_recordable(&resolved) {
                warn!("{}: ignoring include {:?} with a line break", including, resolved);
                continue;
            }

            if config.is_excluded(&resolved) {
                debug!("{}: dropping excluded include {}", including, resolved);
                stats.excluded_includes += 1;
                continue;
            }

            let (dependency, new) = state.track(&resolved, FileKind::Header);
            state.add_dependency(id, dependency)?;
            if new {
                debug!("{}: discovered {}", including, resolved);
                worklist.push_back(dependency);
            }
        }

        state.file_mut(id)?.dependencies_scanned = true;
    }

    stats.sources = state.sources().count();
    stats.headers = state.len() - stats.sources;
    stats.edges = state.edge_count();

    let cycles = state.include_cycles();
    stats.cycles = cycles.len();
    for cycle in &cycles {
        let names: Vec<&str> = cycle
            .iter()
            .filter_map(|id| state.file(*id).ok().map(|f| f.path.as_str()))
            .collect();
        debug!("Include cycle: {}", names.join(" -> "));
    }

    info!(
        "Dependency graph: {} sources, {} headers, {} edges",
        stats.sources, stats.headers, stats.edges
    );
    Ok((state, stats))
}
