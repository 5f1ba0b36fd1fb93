//! cczel - incremental build orchestrator for C and C++ trees
//!
//! cczel walks a source tree, follows quoted `#include` directives to build
//! a file-level dependency graph, compares modification times against a
//! database persisted by the previous run, and recompiles only the
//! compilation units affected by a change before linking everything.
//!
//! ## Architecture
//!
//! - **Paths**: everything is addressed by canonical tree-relative paths ([`path`])
//! - **Graph**: tracked files live in a [`convenient_graph::DependencyGraph`] ([`state`])
//! - **Phases**: scan ([`scanner`]), include graph ([`include`]), change
//!   detection ([`database`], [`propagate`]), execution ([`executor`])
//! - **Maintenance**: dependency queries ([`query`]) and output removal ([`clean`])
//! - **Collaborators**: the filesystem ([`fs::FileSystem`]) and the tools
//!   ([`toolchain::Compiler`], [`toolchain::Linker`]) are traits
//!
//! ## Usage
//!
//! ```no_run
//! use cczel::*;
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let config = Configuration::load("cczel.yml")?;
//! let fs = RealFileSystem::new(&config.root);
//! let executor = BuildExecutor::new(
//!     Box::new(ProcessCompiler::from_config(&config)),
//!     Box::new(ProcessLinker::from_config(&config)),
//!     config.jobs,
//! );
//!
//! let report = run_build(&fs, &config, &executor).await?;
//! report.display();
//! # Ok(())
//! # }
//! ```

pub mod clean;
pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod fs;
pub mod include;
pub mod path;
pub mod pipeline;
pub mod propagate;
pub mod query;
pub mod scanner;
pub mod state;
pub mod toolchain;

pub use clean::{clean_outputs, CleanReport};
pub use config::{Configuration, LinkPolicy, CONFIG_FILE_NAME};
pub use database::BuildDatabase;
pub use error::{BuildError, ConfigError, Result};
pub use executor::{BuildExecutor, ExecutionSummary, LinkStatus};
pub use fs::{FileSystem, RealFileSystem};
pub use pipeline::{plan, run_build, BuildPlan, BuildReport};
pub use query::{dependency_report, DependencyReport};
pub use state::{BuildState, FileKind, ModTime, TrackedFile};
pub use toolchain::{Compiler, Linker, ProcessCompiler, ProcessLinker, ToolOutcome};
