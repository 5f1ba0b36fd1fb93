//! Compiler and linker collaborators
//!
//! The orchestrator only needs a yes/no answer from each tool. The
//! [`ProcessCompiler`] and [`ProcessLinker`] implementations spawn the
//! configured programs; tests substitute recording fakes.

use crate::config::Configuration;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Result of a single tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Tool exited with status 0
    Success,
    /// Tool failed, could not be started, or timed out
    Failed {
        /// Human-readable cause (exit status, captured stderr, timeout)
        reason: String,
    },
}

impl ToolOutcome {
    /// Whether the invocation succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success)
    }
}

/// Everything the compiler needs for one compilation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// Canonical path of the unit
    pub source: String,
    /// Unit location on disk
    pub source_path: PathBuf,
    /// Object output directory on disk
    pub output_dir: PathBuf,
    /// Object file on disk
    pub object_path: PathBuf,
    /// Configured compiler options
    pub options: String,
}

/// Everything the linker needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
    /// Configured linker options
    pub options: String,
    /// Configured libraries
    pub libraries: Vec<String>,
    /// Expected object file of every compilation unit
    pub objects: Vec<PathBuf>,
}

/// Compiles one unit
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile `request.source_path` into `request.object_path`
    async fn compile(&self, request: &CompileRequest) -> ToolOutcome;
}

/// Links the object set
#[async_trait]
pub trait Linker: Send + Sync {
    /// Link every object of `request`
    async fn link(&self, request: &LinkRequest) -> ToolOutcome;
}

/// Runs `<compiler> <options…> -c <source> -o <object>`
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    program: String,
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessCompiler {
    /// Create a compiler running `program` inside `working_dir`
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
            timeout: None,
        }
    }

    /// Abort compilations that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create the compiler described by a configuration
    pub fn from_config(config: &Configuration) -> Self {
        Self::new(&config.compiler, &config.root).with_timeout(config.compile_timeout)
    }
}

#[async_trait]
impl Compiler for ProcessCompiler {
    async fn compile(&self, request: &CompileRequest) -> ToolOutcome {
        let mut command = Command::new(&self.program);
        let _ = command
            .args(request.options.split_whitespace())
            .arg("-c")
            .arg(&request.source_path)
            .arg("-o")
            .arg(&request.object_path)
            .current_dir(&self.working_dir);

        run(command, self.timeout).await
    }
}

/// Runs `<linker> <objects…> <options…> <libraries…>`
#[derive(Debug, Clone)]
pub struct ProcessLinker {
    program: String,
    working_dir: PathBuf,
}

impl ProcessLinker {
    /// Create a linker running `program` inside `working_dir`
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Create the linker described by a configuration
    pub fn from_config(config: &Configuration) -> Self {
        Self::new(&config.linker, &config.root)
    }
}

#[async_trait]
impl Linker for ProcessLinker {
    async fn link(&self, request: &LinkRequest) -> ToolOutcome {
        let mut command = Command::new(&self.program);
        let _ = command
            .args(&request.objects)
            .args(request.options.split_whitespace())
            .args(&request.libraries)
            .current_dir(&self.working_dir);

        run(command, None).await
    }
}

async fn run(mut command: Command, timeout: Option<Duration>) -> ToolOutcome {
    let _ = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!("Running {:?}", command.as_std());

    let output = command.output();
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, output).await {
            Ok(result) => result,
            Err(_) => {
                return ToolOutcome::Failed {
                    reason: format!("timed out after {}s", limit.as_secs_f64()),
                };
            }
        },
        None => output.await,
    };

    match result {
        Ok(output) if output.status.success() => ToolOutcome::Success,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let reason = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                format!("exited with {}: {}", output.status, stderr)
            };
            ToolOutcome::Failed { reason }
        }
        Err(e) => ToolOutcome::Failed {
            reason: format!("failed to start {:?}: {}", command.as_std().get_program(), e),
        },
    }
}
