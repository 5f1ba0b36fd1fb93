//! In-memory build state for a single run
//!
//! A [`BuildState`] owns the tracked-file graph. It is created empty at the
//! start of a run, filled by the scanner and the include graph builder, and
//! dropped after the database has been persisted. Nothing survives between
//! runs except what the timestamp database records.

use crate::Result;
use convenient_graph::{DependencyGraph, NodeId};
use filetime::FileTime;
use std::collections::HashMap;
use std::fmt;

/// Modification time in 100 ns ticks since the Unix epoch
///
/// Stored in the database as a high/low pair of 32-bit halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModTime(u64);

const TICKS_PER_SECOND: u64 = 10_000_000;

impl ModTime {
    /// Create from raw ticks
    pub fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Create from the two 32-bit halves stored in the database
    pub fn from_parts(high: u32, low: u32) -> Self {
        Self((u64::from(high) << 32) | u64::from(low))
    }

    /// Raw tick count
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Upper 32 bits
    pub fn high(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Lower 32 bits
    pub fn low(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }
}

impl From<FileTime> for ModTime {
    fn from(time: FileTime) -> Self {
        // Pre-epoch timestamps clamp to zero
        let seconds = u64::try_from(time.unix_seconds()).unwrap_or(0);
        let ticks = seconds
            .saturating_mul(TICKS_PER_SECOND)
            .saturating_add(u64::from(time.nanoseconds() / 100));
        Self(ticks)
    }
}

impl fmt::Display for ModTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}{:08x}", self.high(), self.low())
    }
}

/// Role of a tracked file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Compilation unit found by the scanner
    Source,
    /// File reached only through an include directive
    Header,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Source => write!(f, "source"),
            FileKind::Header => write!(f, "header"),
        }
    }
}

/// A file known to the build graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    /// Canonical tree-relative path
    pub path: String,

    /// Source or header
    pub kind: FileKind,

    /// Needs recompilation or propagates a change; never cleared mid-run
    pub dirty: bool,

    /// Include directives of this file have been processed
    pub dependencies_scanned: bool,

    /// Modification time observed this run
    pub current_mod_time: Option<ModTime>,

    /// Modification time from the database (`None` = never recorded)
    pub recorded_mod_time: Option<ModTime>,
}

impl TrackedFile {
    /// Create a fresh, clean, unscanned file entry
    pub fn new(path: impl Into<String>, kind: FileKind) -> Self {
        Self {
            path: path.into(),
            kind,
            dirty: false,
            dependencies_scanned: false,
            current_mod_time: None,
            recorded_mod_time: None,
        }
    }

    /// Whether the file changed since the database was written
    pub fn is_modified(&self) -> bool {
        self.current_mod_time != self.recorded_mod_time
    }

    /// Whether this file is a compilation unit
    pub fn is_source(&self) -> bool {
        self.kind == FileKind::Source
    }
}

/// All tracked files of one run and the include edges between them
#[derive(Debug, Default)]
pub struct BuildState {
    graph: DependencyGraph<TrackedFile>,
    by_path: HashMap<String, NodeId>,
}

impl BuildState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path` as `kind` unless it is already tracked.
    ///
    /// Returns the node and whether it was newly created. An existing node
    /// keeps its original kind, so a source included by another source stays
    /// a source.
    pub fn track(&mut self, path: &str, kind: FileKind) -> (NodeId, bool) {
        if let Some(&id) = self.by_path.get(path) {
            return (id, false);
        }
        let id = self.graph.add_node(TrackedFile::new(path, kind));
        let _ = self.by_path.insert(path.to_string(), id);
        (id, true)
    }

    /// Look up a tracked file by canonical path
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    /// Borrow a tracked file
    pub fn file(&self, id: NodeId) -> Result<&TrackedFile> {
        Ok(self.graph.node(id)?)
    }

    /// Mutably borrow a tracked file
    pub fn file_mut(&mut self, id: NodeId) -> Result<&mut TrackedFile> {
        Ok(self.graph.node_mut(id)?)
    }

    /// Record that `dependent` includes `dependency`
    pub fn add_dependency(&mut self, dependent: NodeId, dependency: NodeId) -> Result<()> {
        let _ = self.graph.add_edge(dependent, dependency)?;
        Ok(())
    }

    /// Files `id` includes directly
    pub fn dependencies(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.graph.dependencies(id)?)
    }

    /// Files that include `id` directly
    pub fn dependents(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.graph.dependents(id)?)
    }

    /// Files that include `id` directly or indirectly
    pub fn transitive_dependents(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.graph.transitive_dependents(id)?)
    }

    /// Include cycles present in the graph
    pub fn include_cycles(&self) -> Vec<Vec<NodeId>> {
        self.graph.find_cycles()
    }

    /// All node IDs in discovery order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        self.graph.node_ids()
    }

    /// All tracked files in discovery order
    pub fn files(&self) -> impl Iterator<Item = (NodeId, &TrackedFile)> {
        self.graph.iter()
    }

    /// Tracked compilation units
    pub fn sources(&self) -> impl Iterator<Item = (NodeId, &TrackedFile)> {
        self.files().filter(|(_, file)| file.is_source())
    }

    /// Number of tracked files
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of include edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of files currently marked dirty
    pub fn dirty_count(&self) -> usize {
        self.files().filter(|(_, file)| file.dirty).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_time_parts() {
        let time = ModTime::from_parts(0x01D9_ABCD, 0x1234_5678);
        assert_eq!(time.high(), 0x01D9_ABCD);
        assert_eq!(time.low(), 0x1234_5678);
        assert_eq!(time.to_string(), "01d9abcd12345678");
        assert_eq!(ModTime::from_ticks(time.ticks()), time);
    }

    #[test]
    fn test_mod_time_from_file_time() {
        let time = ModTime::from(FileTime::from_unix_time(1, 500));
        assert_eq!(time.ticks(), 10_000_005);

        let before_epoch = ModTime::from(FileTime::from_unix_time(-5, 0));
        assert_eq!(before_epoch.ticks(), 0);
    }

    #[test]
    fn test_track_is_idempotent() {
        let mut state = BuildState::new();
        let (a, new_a) = state.track("src/a.c", FileKind::Source);
        let (again, new_again) = state.track("src/a.c", FileKind::Header);

        assert!(new_a);
        assert!(!new_again);
        assert_eq!(a, again);
        assert_eq!(state.file(a).unwrap().kind, FileKind::Source);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_is_modified() {
        let mut file = TrackedFile::new("a.c", FileKind::Source);
        assert!(!file.is_modified());

        file.current_mod_time = Some(ModTime::from_ticks(7));
        assert!(file.is_modified());

        file.recorded_mod_time = Some(ModTime::from_ticks(7));
        assert!(!file.is_modified());
    }

    #[test]
    fn test_sources_filter() {
        let mut state = BuildState::new();
        let (a, _) = state.track("a.c", FileKind::Source);
        let (h, _) = state.track("a.h", FileKind::Header);
        state.add_dependency(a, h).unwrap();

        let sources: Vec<_> = state.sources().map(|(id, _)| id).collect();
        assert_eq!(sources, vec![a]);
        assert_eq!(state.dependents(h).unwrap(), vec![a]);
        assert_eq!(state.edge_count(), 1);
    }
}
