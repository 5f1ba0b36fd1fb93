//! Error types for the build orchestrator
//!
//! Only [`BuildError`] aborts a run. Compile failures are per-file outcomes
//! and database problems degrade to a full rebuild, so neither shows up here
//! as a fatal variant.

use crate::path::PathError;
use convenient_graph::GraphError;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a build run before anything is persisted
#[derive(Debug, Error)]
pub enum BuildError {
    /// A path could not be normalized (escapes the tree root, empty component)
    #[error("Invalid path: {0}")]
    Path(#[from] PathError),

    /// Configuration file missing, unparsable or inconsistent
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A directory under an include root could not be listed
    #[error("Cannot enumerate directory '{path}': {source}")]
    DirectoryUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A tracked file could not be read while scanning for includes
    #[error("Cannot read '{path}' while scanning includes: {source}")]
    FileUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A tracked file could not be stat'ed for its modification time
    #[error("Cannot read modification time of '{path}': {source}")]
    Stat {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing the timestamp database or creating the output directory failed
    #[error("IO error on {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    /// Internal graph inconsistency
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// `deps` was asked about a file the graph does not track
    #[error("'{0}' is not tracked by the build graph")]
    NotTracked(String),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error reading {0}: {1}")]
    IoError(PathBuf, String),

    /// YAML parsing error
    #[error("Parse error in {0}: {1}")]
    ParseError(PathBuf, String),

    /// A configured path is not a valid tree-relative path
    #[error("Invalid path for '{key}': {source}")]
    InvalidPath {
        key: &'static str,
        #[source]
        source: PathError,
    },

    /// A semantic constraint was violated
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, BuildError>;
