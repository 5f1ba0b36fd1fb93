//! Dependency queries over a planned build state

use crate::error::BuildError;
use crate::path;
use crate::state::{BuildState, FileKind};
use crate::Result;
use convenient_graph::NodeId;

/// What one tracked file includes and what is affected by it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    /// Canonical path of the queried file
    pub path: String,
    /// Source or header
    pub kind: FileKind,
    /// Whether the next build recompiles it or its dependents
    pub dirty: bool,
    /// Files it includes directly, sorted
    pub includes: Vec<String>,
    /// Files including it directly, sorted
    pub included_by: Vec<String>,
    /// Compilation units rebuilt when it changes, sorted
    pub affected_sources: Vec<String>,
    /// Include cycles passing through it
    pub cycles: Vec<Vec<String>>,
}

/// Describe the dependencies of the file at `target` (any spelling that
/// normalizes to a tracked path).
///
/// # Errors
///
/// Fails when the path does not normalize or is not tracked.
pub fn dependency_report(state: &BuildState, target: &str) -> Result<DependencyReport> {
    let target = path::normalize(target)?;
    let id = state
        .lookup(&target)
        .ok_or_else(|| BuildError::NotTracked(target.clone()))?;
    let file = state.file(id)?;

    let mut affected: Vec<NodeId> = state.transitive_dependents(id)?;
    if file.is_source() && !affected.contains(&id) {
        affected.push(id);
    }
    let affected_sources: Vec<NodeId> = affected
        .into_iter()
        .filter(|d| state.file(*d).is_ok_and(|f| f.is_source()))
        .collect();

    let cycles = state
        .include_cycles()
        .into_iter()
        .filter(|cycle| cycle.contains(&id))
        .map(|cycle| {
            cycle
                .iter()
                .filter_map(|c| state.file(*c).ok().map(|f| f.path.clone()))
                .collect()
        })
        .collect();

    Ok(DependencyReport {
        path: file.path.clone(),
        kind: file.kind,
        dirty: file.dirty,
        includes: sorted_paths(state, &state.dependencies(id)?),
        included_by: sorted_paths(state, &state.dependents(id)?),
        affected_sources: sorted_paths(state, &affected_sources),
        cycles,
    })
}

fn sorted_paths(state: &BuildState, ids: &[NodeId]) -> Vec<String> {
    let mut paths: Vec<String> = ids
        .iter()
        .filter_map(|id| state.file(*id).ok())
        .map(|f| f.path.clone())
        .collect();
    paths.sort();
    paths
}
