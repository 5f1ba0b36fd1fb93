//! cczel command-line interface
//!
//! - `build`: incremental compile and link (default)
//! - `status`: show what a build would recompile
//! - `deps`: dependency exploration for one file
//! - `clean`: drop the database and objects

use clap::{Parser, Subcommand};
use cczel::{Configuration, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

pub mod build;
pub mod clean;
pub mod deps;
pub mod status;

/// Error type shared by all commands
pub type CommandError = Box<dyn std::error::Error + Send + Sync>;

/// cczel - incremental build orchestrator for C and C++ trees
#[derive(Parser)]
#[command(name = "cczel")]
#[command(about = "Incremental build orchestrator for C and C++ source trees")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (its directory is the tree root)
    #[arg(short, long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Print per-file debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile changed units and link
    Build {
        /// Maximum number of concurrent compilations
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Skip linking when any compilation failed
        #[arg(long)]
        strict_link: bool,
    },

    /// Show changed files and the units a build would compile
    Status,

    /// Show what a tracked file includes and what depends on it
    Deps {
        /// Tree-relative path of the file
        path: String,
    },

    /// Remove the build database and object files
    Clean,
}

/// Load the configuration named on the command line
pub fn load_config(path: &Path) -> Result<Configuration, CommandError> {
    if !path.exists() {
        return Err(format!("configuration file not found: {}", path.display()).into());
    }
    tracing::debug!("Loading configuration from {}", path.display());
    Ok(Configuration::load(path)?)
}
