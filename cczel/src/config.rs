//! `cczel.yml` loading
//!
//! The configuration file lives at the tree root; every path in it is
//! relative to that directory. Example:
//!
//! ```yaml
//! include:
//!   - src
//!   - lib
//! exclude:
//!   - lib/third_party
//! obj_output: build/obj
//! cl_options: -O2 -Wall -Iinclude
//! link_options: -o build/app
//! libraries:
//!   - -lm
//! ```

use crate::error::ConfigError;
use crate::path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "cczel.yml";

/// Database file name inside the object output directory
pub const DATABASE_FILE_NAME: &str = "cczel.db";

/// Object file extension for the host toolchain
pub const OBJECT_EXTENSION: &str = if cfg!(windows) { "obj" } else { "o" };

/// Whether the linker runs when some compilations failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPolicy {
    /// Link after every run, even with failed units (stale objects may be used)
    #[default]
    Always,
    /// Skip the link step when any compilation failed
    OnSuccess,
}

/// Raw `cczel.yml` contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Directories scanned for compilation units
    pub include: Vec<String>,
    /// Directories never scanned nor tracked
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Output directory for objects and the timestamp database
    #[serde(default = "default_obj_output")]
    pub obj_output: String,
    /// Compiler options
    #[serde(default)]
    pub cl_options: String,
    /// Linker options
    #[serde(default)]
    pub link_options: String,
    /// Libraries passed to the linker
    #[serde(default)]
    pub libraries: Vec<String>,
    /// Compiler program
    #[serde(default = "default_tool")]
    pub compiler: String,
    /// Linker program
    #[serde(default = "default_tool")]
    pub linker: String,
    /// Extensions of compilation units
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
    /// Parallel compilations (defaults to the CPU count)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    /// Per-compilation timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_timeout_secs: Option<u64>,
    /// Link behaviour after failed compilations
    #[serde(default)]
    pub link_policy: LinkPolicy,
}

fn default_obj_output() -> String {
    "obj".to_string()
}

fn default_tool() -> String {
    "cc".to_string()
}

fn default_source_extensions() -> Vec<String> {
    ["c", "cc", "cpp", "cxx"].iter().map(ToString::to_string).collect()
}

/// Validated configuration with canonical paths, immutable for a run
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Tree root on disk
    pub root: PathBuf,
    /// Canonical include roots, in configured order
    pub include_roots: Vec<String>,
    /// Canonical exclude roots, in configured order
    pub exclude_roots: Vec<String>,
    /// Canonical object output directory
    pub obj_output: String,
    /// Compiler options
    pub cl_options: String,
    /// Linker options
    pub link_options: String,
    /// Libraries passed to the linker
    pub libraries: Vec<String>,
    /// Compiler program
    pub compiler: String,
    /// Linker program
    pub linker: String,
    /// Compilation unit extensions, without leading dots
    pub source_extensions: Vec<String>,
    /// Parallel compilations
    pub jobs: usize,
    /// Per-compilation timeout
    pub compile_timeout: Option<Duration>,
    /// Link behaviour after failed compilations
    pub link_policy: LinkPolicy,
}

impl Configuration {
    /// Load and validate a configuration file; its directory becomes the tree root
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;

        let file: ConfigFile = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self::from_file(root, file)
    }

    /// Parse YAML text for a tree rooted at `root`
    pub fn from_yaml(root: impl Into<PathBuf>, yaml: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(yaml)
            .map_err(|e| ConfigError::ParseError(PathBuf::from(CONFIG_FILE_NAME), e.to_string()))?;
        Self::from_file(root.into(), file)
    }

    /// Validate raw settings and canonicalize their paths
    pub fn from_file(root: PathBuf, file: ConfigFile) -> Result<Self, ConfigError> {
        if file.include.is_empty() {
            return Err(ConfigError::Invalid(
                "'include' must list at least one directory".to_string(),
            ));
        }

        let include_roots = normalize_dirs("include", &file.include)?;
        let exclude_roots = normalize_dirs("exclude", &file.exclude)?;
        let obj_output = path::normalize_dir(&file.obj_output)
            .map_err(|source| ConfigError::InvalidPath { key: "obj_output", source })?;

        let source_extensions: Vec<String> = file
            .source_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();
        if source_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "'source_extensions' must not be empty".to_string(),
            ));
        }

        let jobs = match file.jobs {
            Some(0) => {
                return Err(ConfigError::Invalid("'jobs' must be at least 1".to_string()));
            }
            Some(jobs) => jobs,
            None => num_cpus::get().max(1),
        };

        if file.compiler.trim().is_empty() || file.linker.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "'compiler' and 'linker' must not be empty".to_string(),
            ));
        }

        Ok(Self {
            root,
            include_roots,
            exclude_roots,
            obj_output,
            cl_options: file.cl_options,
            link_options: file.link_options,
            libraries: file.libraries,
            compiler: file.compiler,
            linker: file.linker,
            source_extensions,
            jobs,
            compile_timeout: file.compile_timeout_secs.map(Duration::from_secs),
            link_policy: file.link_policy,
        })
    }

    /// Exact-match exclusion check used while walking directories
    pub fn is_excluded_root(&self, dir: &str) -> bool {
        self.exclude_roots.iter().any(|excluded| excluded == dir)
    }

    /// Whether a canonical path lies under any exclusion root
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_roots
            .iter()
            .any(|excluded| path::is_under(path, excluded))
    }

    /// Whether a file name has a compilation unit extension
    pub fn is_source_file(&self, name: &str) -> bool {
        path::extension(name)
            .is_some_and(|ext| self.source_extensions.iter().any(|known| known == ext))
    }

    /// Canonical object path of a compilation unit
    pub fn object_path(&self, source: &str) -> String {
        format!(
            "{}{}.{}",
            self.obj_output,
            path::file_stem(source),
            OBJECT_EXTENSION
        )
    }

    /// Canonical path of the timestamp database
    pub fn database_path(&self) -> String {
        format!("{}{}", self.obj_output, DATABASE_FILE_NAME)
    }

    /// Location of a canonical path on disk
    pub fn resolve(&self, canonical: &str) -> PathBuf {
        path::to_disk(&self.root, canonical)
    }
}

fn normalize_dirs(key: &'static str, dirs: &[String]) -> Result<Vec<String>, ConfigError> {
    dirs.iter()
        .map(|dir| {
            path::normalize_dir(dir).map_err(|source| ConfigError::InvalidPath { key, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Configuration::from_yaml("/project", "include: [src]").unwrap();

        assert_eq!(config.include_roots, vec!["src/"]);
        assert!(config.exclude_roots.is_empty());
        assert_eq!(config.obj_output, "obj/");
        assert_eq!(config.compiler, "cc");
        assert_eq!(config.source_extensions, vec!["c", "cc", "cpp", "cxx"]);
        assert!(config.jobs >= 1);
        assert_eq!(config.compile_timeout, None);
        assert_eq!(config.link_policy, LinkPolicy::Always);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
include:
  - ./src
  - lib/
exclude:
  - lib/vendor
obj_output: build/obj
cl_options: -O2 -Wall
link_options: -o build/app
libraries:
  - -lm
  - -lpthread
compiler: clang
linker: clang
source_extensions: [".c", "m"]
jobs: 3
compile_timeout_secs: 30
link_policy: on_success
"#;
        let config = Configuration::from_yaml("/project", yaml).unwrap();

        assert_eq!(config.include_roots, vec!["src/", "lib/"]);
        assert_eq!(config.exclude_roots, vec!["lib/vendor/"]);
        assert_eq!(config.obj_output, "build/obj/");
        assert_eq!(config.cl_options, "-O2 -Wall");
        assert_eq!(config.libraries, vec!["-lm", "-lpthread"]);
        assert_eq!(config.source_extensions, vec!["c", "m"]);
        assert_eq!(config.jobs, 3);
        assert_eq!(config.compile_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.link_policy, LinkPolicy::OnSuccess);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = Configuration::from_yaml("/p", "include: [src]\ninclud: [x]\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_, _))));
    }

    #[test]
    fn test_empty_include_rejected() {
        let result = Configuration::from_yaml("/p", "include: []");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let result = Configuration::from_yaml("/p", "include: [src]\njobs: 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_escaping_path_rejected() {
        let result = Configuration::from_yaml("/p", "include: [../elsewhere]");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidPath { key: "include", .. })
        ));
    }

    #[test]
    fn test_exclusion_checks() {
        let config =
            Configuration::from_yaml("/p", "include: [src]\nexclude: [src/vendor]").unwrap();

        assert!(config.is_excluded_root("src/vendor/"));
        assert!(!config.is_excluded_root("src/vendor/zlib/"));
        assert!(config.is_excluded("src/vendor/zlib/zlib.h"));
        assert!(!config.is_excluded("src/vendor_patches.h"));
    }

    #[test]
    fn test_object_and_database_paths() {
        let config = Configuration::from_yaml("/p", "include: [src]\nobj_output: out").unwrap();

        assert_eq!(
            config.object_path("src/net/socket.cpp"),
            format!("out/socket.{OBJECT_EXTENSION}")
        );
        assert_eq!(config.database_path(), "out/cczel.db");
        assert_eq!(config.resolve("out/"), PathBuf::from("/p/out"));
    }

    #[test]
    fn test_is_source_file() {
        let config = Configuration::from_yaml("/p", "include: [src]").unwrap();
        assert!(config.is_source_file("main.c"));
        assert!(config.is_source_file("main.cxx"));
        assert!(!config.is_source_file("main.h"));
        assert!(!config.is_source_file("README"));
    }

    #[test]
    fn test_load_uses_parent_as_root() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "include: [src]\n").unwrap();

        let config = Configuration::load(&path).unwrap();
        assert_eq!(config.root, temp.path());
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = Configuration::load(temp.path().join("absent.yml"));
        assert!(matches!(result, Err(ConfigError::IoError(_, _))));
    }
}
