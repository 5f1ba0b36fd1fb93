//! One build run, phase by phase
//!
//! 1. Scan include roots for compilation units
//! 2. Build the include graph
//! 3. Load the database and stat every tracked file
//! 4. Propagate dirtiness
//! 5. Compile, link, persist ([`BuildExecutor`])
//!
//! [`plan`] stops after step 4 and never touches the tools or the database.

use crate::config::Configuration;
use crate::database::BuildDatabase;
use crate::executor::{BuildExecutor, ExecutionSummary, LinkStatus};
use crate::fs::FileSystem;
use crate::include::{self, GraphStats};
use crate::propagate::{self, PropagationStats};
use crate::scanner;
use crate::state::BuildState;
use crate::Result;
use std::time::{Duration, Instant};
use tracing::info;

/// Wall-clock time per phase
#[derive(Debug, Clone, Default)]
pub struct PhaseTimings {
    /// Source tree scan
    pub scan: Duration,
    /// Include graph construction
    pub graph: Duration,
    /// Database load, stat and propagation
    pub change_detection: Duration,
    /// Compilations
    pub compile: Duration,
    /// Link step
    pub link: Duration,
    /// Database write
    pub persist: Duration,
}

impl PhaseTimings {
    /// Sum of all phases
    pub fn total(&self) -> Duration {
        self.scan + self.graph + self.change_detection + self.compile + self.link + self.persist
    }
}

/// Dependency state after change detection
#[derive(Debug)]
pub struct BuildPlan {
    /// Tracked files with dirty flags set
    pub state: BuildState,
    /// Graph construction summary
    pub graph: GraphStats,
    /// Change detection summary
    pub propagation: PropagationStats,
    /// Database records that no longer match a tracked file
    pub stale_records: usize,
    /// Timings of the phases run so far
    pub timings: PhaseTimings,
}

impl BuildPlan {
    /// Paths of the compilation units that would be recompiled, sorted
    pub fn dirty_sources(&self) -> Vec<&str> {
        let mut dirty: Vec<&str> = self
            .state
            .sources()
            .filter(|(_, f)| f.dirty)
            .map(|(_, f)| f.path.as_str())
            .collect();
        dirty.sort_unstable();
        dirty
    }
}

/// Everything that happened during a build
#[derive(Debug)]
pub struct BuildReport {
    /// Graph construction summary
    pub graph: GraphStats,
    /// Change detection summary
    pub propagation: PropagationStats,
    /// Compile, link and persist outcome
    pub execution: ExecutionSummary,
    /// Timings of every phase
    pub timings: PhaseTimings,
}

impl BuildReport {
    /// Whether every compilation and the link succeeded
    pub fn is_success(&self) -> bool {
        self.execution.is_success()
    }

    /// Print a human-readable summary
    pub fn display(&self) {
        let execution = &self.execution;
        println!("\n📊 Build Summary:");
        println!("  Sources:        {}", self.graph.sources);
        println!("  Headers:        {}", self.graph.headers);
        println!("  Changed files:  {}", self.propagation.modified);
        println!("  Compiled:       {}", execution.compiled.len());
        println!("  Failed:         {}", execution.failed.len());
        println!("  Up to date:     {}", execution.up_to_date);
        match &execution.link {
            LinkStatus::Linked => println!("  Link:           ok"),
            LinkStatus::Failed(reason) => println!("  Link:           failed ({reason})"),
            LinkStatus::Skipped => println!("  Link:           skipped"),
        }

        for failure in &execution.failed {
            println!("  ❌ {}: {}", failure.path, failure.reason);
        }

        let t = &self.timings;
        println!("\n⏱️  Timing:");
        println!("  Scan:           {:.3}s", t.scan.as_secs_f64());
        println!("  Include graph:  {:.3}s", t.graph.as_secs_f64());
        println!("  Change check:   {:.3}s", t.change_detection.as_secs_f64());
        println!("  Compile:        {:.3}s", t.compile.as_secs_f64());
        println!("  Link:           {:.3}s", t.link.as_secs_f64());
        println!("  Save database:  {:.3}s", t.persist.as_secs_f64());
        println!("  Total:          {:.3}s", t.total().as_secs_f64());
    }
}

/// Scan, build the graph and mark dirty files without running any tool
pub fn plan<F: FileSystem + ?Sized>(fs: &F, config: &Configuration) -> Result<BuildPlan> {
    let mut timings = PhaseTimings::default();

    let start = Instant::now();
    let sources = scanner::scan_sources(fs, config)?;
    timings.scan = start.elapsed();

    let start = Instant::now();
    let (mut state, graph) = include::build_graph(fs, config, &sources)?;
    timings.graph = start.elapsed();

    let start = Instant::now();
    let database = BuildDatabase::load(&config.resolve(&config.database_path()));
    let stale_records = database.apply(&mut state)?;
    propagate::stat_files(fs, &mut state)?;
    let propagation = propagate::propagate(&mut state)?;
    timings.change_detection = start.elapsed();

    Ok(BuildPlan {
        state,
        graph,
        propagation,
        stale_records,
        timings,
    })
}

/// Run a complete incremental build.
///
/// Unreadable directories or files, paths escaping the tree and database
/// write failures abort the run. Compile and link failures are reported in
/// the returned [`BuildReport`].
pub async fn run_build<F: FileSystem + ?Sized>(
    fs: &F,
    config: &Configuration,
    executor: &BuildExecutor,
) -> Result<BuildReport> {
    let BuildPlan {
        mut state,
        graph,
        propagation,
        mut timings,
        ..
    } = plan(fs, config)?;

    let execution = executor.execute(config, &mut state).await?;
    timings.compile = execution.compile_time;
    timings.link = execution.link_time;
    timings.persist = execution.persist_time;

    info!(
        "Build finished in {:.2}s: {} compiled, {} failed",
        timings.total().as_secs_f64(),
        execution.compiled.len(),
        execution.failed.len()
    );

    Ok(BuildReport {
        graph,
        propagation,
        execution,
        timings,
    })
}
