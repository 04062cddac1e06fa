//! Worker process spawner.
//!
//! Resolves the configured target into a concrete command and launches it
//! with:
//! - stdin, stdout and stderr piped (stdout is the primary stream, stderr the
//!   secondary stream);
//! - `kill_on_drop(true)` so an abandoned worker never outlives the run;
//! - no protocol data on the command line. Everything the worker needs
//!   travels through the handshake and its own requests.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

use crate::transport::TransportOptions;
use crate::{AppError, Result};

/// Budget for both stream tasks to finish after the worker exits.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// How the worker target is started.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Launcher {
    /// Run the target as an executable. A bare name is looked up on `PATH`.
    #[default]
    Direct,
    /// Run `java -jar <target>`.
    Java,
}

/// Configuration for resolving and supervising one worker.
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Worker executable or jar.
    pub target: String,
    /// Launch mode.
    pub launcher: Launcher,
    /// Java binary for [`Launcher::Java`].
    pub java_bin: String,
    /// Extra arguments after the target.
    pub args: Vec<String>,
    /// Whether a missing target fails the run or skips it.
    pub fail_on_missing_target: bool,
    /// Stream tunables.
    pub transport: TransportOptions,
    /// Post-exit drain budget.
    pub drain_timeout: Duration,
}

impl SpawnConfig {
    /// Direct launch of `target` with default settings.
    #[must_use]
    pub fn direct(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            launcher: Launcher::Direct,
            java_bin: "java".into(),
            args: Vec::new(),
            fail_on_missing_target: true,
            transport: TransportOptions::default(),
            drain_timeout: DRAIN_TIMEOUT,
        }
    }
}

/// A command ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// Program to execute.
    pub program: PathBuf,
    /// Arguments in order.
    pub args: Vec<String>,
}

/// Result of target resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The target exists.
    Ready(ResolvedCommand),
    /// The target is missing and the configuration asks to skip the run.
    Skip(String),
}

/// Live stdio handles of a spawned worker.
#[derive(Debug)]
pub struct WorkerConnection {
    /// Child process handle; dropping it kills the worker.
    pub child: Child,
    /// Orchestrator → worker stream.
    pub stdin: ChildStdin,
    /// Primary worker → orchestrator stream.
    pub stdout: ChildStdout,
    /// Secondary worker → orchestrator stream.
    pub stderr: ChildStderr,
}

/// Resolve the configured target into a command.
///
/// # Errors
///
/// - `AppError::Config("worker target missing: …")` when the target does not
///   exist and `fail_on_missing_target` is set.
/// - `AppError::Config("java binary not found: …")` when the Java launcher
///   cannot find its runtime.
pub fn resolve_command(config: &SpawnConfig) -> Result<Resolution> {
    match config.launcher {
        Launcher::Direct => match locate_executable(&config.target) {
            Some(program) => Ok(Resolution::Ready(ResolvedCommand {
                program,
                args: config.args.clone(),
            })),
            None => missing_target(config),
        },
        Launcher::Java => {
            if !Path::new(&config.target).is_file() {
                return missing_target(config);
            }
            let program = which::which(&config.java_bin).map_err(|err| {
                AppError::Config(format!("java binary not found: {}: {err}", config.java_bin))
            })?;
            let mut args = vec!["-jar".to_owned(), config.target.clone()];
            args.extend(config.args.iter().cloned());
            Ok(Resolution::Ready(ResolvedCommand { program, args }))
        }
    }
}

/// Spawn `command` with piped stdio.
///
/// # Errors
///
/// - `AppError::Io("failed to spawn worker: …")` on OS spawn failure.
/// - `AppError::Io("failed to capture worker …")` if a pipe is unavailable.
pub fn spawn_worker(command: &ResolvedCommand) -> Result<WorkerConnection> {
    info!(
        program = %command.program.display(),
        args = ?command.args,
        "spawning worker"
    );

    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| AppError::Io(format!("failed to spawn worker: {err}")))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| AppError::Io("failed to capture worker stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Io("failed to capture worker stdout".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::Io("failed to capture worker stderr".into()))?;

    debug!(pid = child.id(), "worker spawned");
    Ok(WorkerConnection {
        child,
        stdin,
        stdout,
        stderr,
    })
}

/// Paths are checked directly; bare names are searched on `PATH`.
fn locate_executable(target: &str) -> Option<PathBuf> {
    let path = Path::new(target);
    if path.components().count() > 1 || path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    which::which(target).ok()
}

fn missing_target(config: &SpawnConfig) -> Result<Resolution> {
    let reason = format!("worker target missing: {}", config.target);
    if config.fail_on_missing_target {
        Err(AppError::Config(reason))
    } else {
        info!(worker_target = %config.target, "worker target missing, skipping run");
        Ok(Resolution::Skip(reason))
    }
}
