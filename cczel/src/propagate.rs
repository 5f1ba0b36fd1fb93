//! Change detection and dirty propagation

use crate::error::BuildError;
use crate::fs::FileSystem;
use crate::state::BuildState;
use crate::Result;
use convenient_graph::NodeId;
use tracing::{debug, info};

/// Outcome of a propagation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationStats {
    /// Files whose own modification time changed
    pub modified: usize,
    /// Files dirty after flooding
    pub dirty: usize,
    /// Compilation units that need recompiling
    pub dirty_sources: usize,
}

/// Read the current modification time of every tracked file.
///
/// A file that vanished between scanning and stat'ing is fatal: the graph
/// would be inconsistent.
pub fn stat_files<F: FileSystem + ?Sized>(fs: &F, state: &mut BuildState) -> Result<()> {
    for id in state.ids() {
        let file = state.file_mut(id)?;
        let time = fs.modified(&file.path).map_err(|source| BuildError::Stat {
            path: file.path.clone(),
            source,
        })?;
        file.current_mod_time = Some(time);
    }
    Ok(())
}

/// Mark every modified file and all of its transitive dependents dirty.
///
/// Expects `current_mod_time` and `recorded_mod_time` to be filled in.
pub fn propagate(state: &mut BuildState) -> Result<PropagationStats> {
    let mut stats = PropagationStats::default();

    for id in state.ids() {
        let file = state.file(id)?;
        if file.is_modified() {
            debug!("{} changed", file.path);
            stats.modified += 1;
            let _ = mark_dirty(state, id)?;
        }
    }

    stats.dirty = state.dirty_count();
    stats.dirty_sources = state.sources().filter(|(_, f)| f.dirty).count();

    info!(
        "{} files changed, {} dirty, {} units to compile",
        stats.modified, stats.dirty, stats.dirty_sources
    );
    Ok(stats)
}

/// Flood dirtiness from `origin` along reverse include edges.
///
/// Nodes that are already dirty stop the flood, which keeps it linear and
/// terminates on include cycles. Returns the number of newly marked files.
pub fn mark_dirty(state: &mut BuildState, origin: NodeId) -> Result<usize> {
    let mut marked = 0;
    let mut stack = vec![origin];

    while let Some(id) = stack.pop() {
        let file = state.file_mut(id)?;
        if file.dirty {
            continue;
        }
        file.dirty = true;
        marked += 1;
        stack.extend(state.dependents(id)?);
    }

    Ok(marked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FileKind, ModTime};

    /// a.c -> b.h -> c.h, d.c standalone, all unchanged
    fn chain() -> (BuildState, [NodeId; 4]) {
        let mut state = BuildState::new();
        let (a, _) = state.track("a.c", FileKind::Source);
        let (b, _) = state.track("b.h", FileKind::Header);
        let (c, _) = state.track("c.h", FileKind::Header);
        let (d, _) = state.track("d.c", FileKind::Source);
        state.add_dependency(a, b).unwrap();
        state.add_dependency(b, c).unwrap();

        for id in [a, b, c, d] {
            let file = state.file_mut(id).unwrap();
            file.current_mod_time = Some(ModTime::from_ticks(10));
            file.recorded_mod_time = Some(ModTime::from_ticks(10));
        }
        (state, [a, b, c, d])
    }

    fn dirty(state: &BuildState) -> Vec<String> {
        let mut paths: Vec<String> = state
            .files()
            .filter(|(_, f)| f.dirty)
            .map(|(_, f)| f.path.clone())
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn test_nothing_changed() {
        let (mut state, _) = chain();
        let stats = propagate(&mut state).unwrap();
        assert_eq!(stats, PropagationStats::default());
    }

    #[test]
    fn test_leaf_change_floods_to_source() {
        let (mut state, [_, _, c, _]) = chain();
        state.file_mut(c).unwrap().current_mod_time = Some(ModTime::from_ticks(11));

        let stats = propagate(&mut state).unwrap();
        assert_eq!(dirty(&state), vec!["a.c", "b.h", "c.h"]);
        assert_eq!(stats.modified, 1);
        assert_eq!(stats.dirty, 3);
        assert_eq!(stats.dirty_sources, 1);
    }

    #[test]
    fn test_source_change_stays_local() {
        let (mut state, [_, _, _, d]) = chain();
        state.file_mut(d).unwrap().current_mod_time = Some(ModTime::from_ticks(9));

        let _ = propagate(&mut state).unwrap();
        assert_eq!(dirty(&state), vec!["d.c"]);
    }

    #[test]
    fn test_never_recorded_is_dirty() {
        let (mut state, [a, _, _, _]) = chain();
        state.file_mut(a).unwrap().recorded_mod_time = None;

        let _ = propagate(&mut state).unwrap();
        assert_eq!(dirty(&state), vec!["a.c"]);
    }

    #[test]
    fn test_flood_is_idempotent_and_short_circuits() {
        let (mut state, [a, b, c, _]) = chain();

        assert_eq!(mark_dirty(&mut state, b).unwrap(), 2);
        // c reaches b and a, which are already dirty
        assert_eq!(mark_dirty(&mut state, c).unwrap(), 1);
        assert_eq!(mark_dirty(&mut state, a).unwrap(), 0);
        assert_eq!(state.dirty_count(), 3);
    }

    #[test]
    fn test_flood_terminates_on_cycle() {
        let mut state = BuildState::new();
        let (s, _) = state.track("s.c", FileKind::Source);
        let (x, _) = state.track("x.h", FileKind::Header);
        let (y, _) = state.track("y.h", FileKind::Header);
        state.add_dependency(s, x).unwrap();
        state.add_dependency(x, y).unwrap();
        state.add_dependency(y, x).unwrap();

        assert_eq!(mark_dirty(&mut state, y).unwrap(), 3);
    }

    #[test]
    fn test_stat_files() {
        use crate::fs::memory::MemoryFileSystem;

        let mut fs = MemoryFileSystem::new().with_file("a.c", "");
        fs.touch("a.c", 99);
        let mut state = BuildState::new();
        let (a, _) = state.track("a.c", FileKind::Source);

        stat_files(&fs, &mut state).unwrap();
        assert_eq!(
            state.file(a).unwrap().current_mod_time,
            Some(ModTime::from_ticks(99))
        );

        let _ = state.track("gone.h", FileKind::Header);
        assert!(matches!(
            stat_files(&fs, &mut state),
            Err(BuildError::Stat { path, .. }) if path == "gone.h"
        ));
    }
}
