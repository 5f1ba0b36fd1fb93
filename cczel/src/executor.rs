//! Build execution: compile dirty units, link, persist the database

use crate::config::{Configuration, LinkPolicy};
use crate::database::BuildDatabase;
use crate::error::BuildError;
use crate::path;
use crate::state::BuildState;
use crate::toolchain::{CompileRequest, Compiler, LinkRequest, Linker, ToolOutcome};
use crate::Result;
use convenient_graph::NodeId;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// A compilation unit that failed to compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFailure {
    /// Canonical path of the unit
    pub path: String,
    /// Cause reported by the compiler collaborator
    pub reason: String,
}

/// What happened to the link step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// Linker succeeded
    Linked,
    /// Linker failed
    Failed(String),
    /// Not attempted because compilations failed and the policy forbids it
    Skipped,
}

/// Outcome of the execution phase of a run
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Units compiled successfully, in path order
    pub compiled: Vec<String>,
    /// Units that failed, in path order
    pub failed: Vec<CompileFailure>,
    /// Units that were not dirty
    pub up_to_date: usize,
    /// Link result
    pub link: LinkStatus,
    /// Time spent compiling
    pub compile_time: Duration,
    /// Time spent linking
    pub link_time: Duration,
    /// Time spent writing the database
    pub persist_time: Duration,
}

impl ExecutionSummary {
    /// Whether every compilation and the link succeeded
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.link == LinkStatus::Linked
    }
}

/// Drives the compiler and linker collaborators over a propagated build state
pub struct BuildExecutor {
    compiler: Box<dyn Compiler>,
    linker: Box<dyn Linker>,
    jobs: usize,
    link_policy: LinkPolicy,
}

impl BuildExecutor {
    /// Create an executor running up to `jobs` compilations at once
    pub fn new(compiler: Box<dyn Compiler>, linker: Box<dyn Linker>, jobs: usize) -> Self {
        Self {
            compiler,
            linker,
            jobs: jobs.max(1),
            link_policy: LinkPolicy::Always,
        }
    }

    /// Choose whether to link after failed compilations
    pub fn with_link_policy(mut self, link_policy: LinkPolicy) -> Self {
        self.link_policy = link_policy;
        self
    }

    /// Compile, link and persist.
    ///
    /// Compile failures do not abort the run. The database is written after
    /// every compile attempt has settled and after linking.
    pub async fn execute(
        &self,
        config: &Configuration,
        state: &mut BuildState,
    ) -> Result<ExecutionSummary> {
        let start = Instant::now();
        let (compiled, failed, up_to_date) = self.compile_dirty(config, state).await?;
        let compile_time = start.elapsed();

        let start = Instant::now();
        let link = self.link(config, state, failed.len()).await?;
        let link_time = start.elapsed();

        let start = Instant::now();
        let database_path = config.resolve(&config.database_path());
        BuildDatabase::from_state(state)
            .save(&database_path)
            .map_err(|e| BuildError::Io(database_path.clone(), e))?;
        let persist_time = start.elapsed();

        Ok(ExecutionSummary {
            compiled,
            failed,
            up_to_date,
            link,
            compile_time,
            link_time,
            persist_time,
        })
    }

    /// Compile every dirty source and advance recorded modification times.
    ///
    /// Every tracked file gets `recorded = current`, except failed units,
    /// whose record is cleared so that the next run retries them even when
    /// only one of their headers had changed.
    async fn compile_dirty(
        &self,
        config: &Configuration,
        state: &mut BuildState,
    ) -> Result<(Vec<String>, Vec<CompileFailure>, usize)> {
        let output_dir = config.resolve(&config.obj_output);
        std::fs::create_dir_all(&output_dir).map_err(|e| BuildError::Io(output_dir.clone(), e))?;

        let mut requests: Vec<(NodeId, CompileRequest)> = state
            .sources()
            .filter(|(_, file)| file.dirty)
            .map(|(id, file)| {
                let request = CompileRequest {
                    source: file.path.clone(),
                    source_path: config.resolve(&file.path),
                    output_dir: output_dir.clone(),
                    object_path: config.resolve(&config.object_path(&file.path)),
                    options: config.cl_options.clone(),
                };
                (id, request)
            })
            .collect();
        requests.sort_by(|a, b| a.1.source.cmp(&b.1.source));

        let up_to_date = state.sources().count() - requests.len();
        info!(
            "Compiling {} units ({} up to date, {} jobs)",
            requests.len(),
            up_to_date,
            self.jobs
        );

        // Units writing the same object run one after another
        let mut by_object: BTreeMap<PathBuf, Vec<(NodeId, CompileRequest)>> = BTreeMap::new();
        for (id, request) in requests {
            by_object
                .entry(request.object_path.clone())
                .or_default()
                .push((id, request));
        }
        for (object, group) in &by_object {
            if group.len() > 1 {
                let sources: Vec<&str> = group.iter().map(|(_, r)| r.source.as_str()).collect();
                warn!(
                    "{} all compile to {}; compiling them one at a time",
                    sources.join(", "),
                    object.display()
                );
            }
        }

        let compiler = self.compiler.as_ref();
        let mut outcomes: Vec<(NodeId, String, ToolOutcome)> = stream::iter(by_object.into_values())
            .map(|group| async move {
                let mut results = Vec::with_capacity(group.len());
                for (id, request) in group {
                    info!("Compiling {}", request.source);
                    let outcome = compiler.compile(&request).await;
                    results.push((id, request.source, outcome));
                }
                results
            })
            .buffer_unordered(self.jobs)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();
        outcomes.sort_by(|a, b| a.1.cmp(&b.1));

        let mut compiled = Vec::new();
        let mut failed = Vec::new();
        let mut failed_ids = Vec::new();
        for (id, path, outcome) in outcomes {
            match outcome {
                ToolOutcome::Success => compiled.push(path),
                ToolOutcome::Failed { reason } => {
                    error!("Compile failed ({}): {}: {}", failed.len() + 1, path, reason);
                    failed_ids.push(id);
                    failed.push(CompileFailure { path, reason });
                }
            }
        }

        for id in state.ids() {
            let file = state.file_mut(id)?;
            file.recorded_mod_time = file.current_mod_time;
        }
        for id in failed_ids {
            state.file_mut(id)?.recorded_mod_time = None;
        }

        Ok((compiled, failed, up_to_date))
    }

    async fn link(
        &self,
        config: &Configuration,
        state: &BuildState,
        failures: usize,
    ) -> Result<LinkStatus> {
        if failures > 0 && self.link_policy == LinkPolicy::OnSuccess {
            warn!("Skipping link: {} compilations failed", failures);
            return Ok(LinkStatus::Skipped);
        }
        if failures > 0 {
            warn!(
                "Linking despite {} failed compilations; stale or missing objects may be used",
                failures
            );
        }

        let objects = expected_objects(config, state);
        info!("Linking {} objects", objects.len());

        let request = LinkRequest {
            options: config.link_options.clone(),
            libraries: config.libraries.clone(),
            objects,
        };
        match self.linker.link(&request).await {
            ToolOutcome::Success => Ok(LinkStatus::Linked),
            ToolOutcome::Failed { reason } => {
                error!("Link failed: {}", reason);
                Ok(LinkStatus::Failed(reason))
            }
        }
    }
}

/// Object file of every tracked source, in source path order.
///
/// Sources sharing a file stem map to the same object; each collision is
/// reported once and the object is listed once.
pub fn expected_objects(config: &Configuration, state: &BuildState) -> Vec<PathBuf> {
    let mut sources: Vec<&str> = state.sources().map(|(_, f)| f.path.as_str()).collect();
    sources.sort_unstable();

    let mut owners: HashMap<String, &str> = HashMap::new();
    let mut objects = Vec::new();
    for source in sources {
        let object = config.object_path(source);
        if let Some(first) = owners.get(&object) {
            warn!(
                "{} and {} both compile to {}",
                first,
                source,
                path::file_name(&object)
            );
            continue;
        }
        objects.push(config.resolve(&object));
        let _ = owners.insert(object, source);
    }
    objects
}
