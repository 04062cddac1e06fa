//! Runner configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::supervisor::spawner::{Launcher, SpawnConfig, DRAIN_TIMEOUT};
use crate::transport::TransportOptions;
use crate::{AppError, Result};

/// Stream tunables.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TransportConfig {
    /// Backoff between availability checks of a worker stream.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Longest accepted line from the worker.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_max_line_bytes() -> usize {
    crate::protocol::codec::MAX_LINE_BYTES
}

fn default_true() -> bool {
    true
}

fn default_java_bin() -> String {
    "java".into()
}

/// Runner configuration parsed from a TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RunnerConfig {
    /// Worker executable, or the jar when `launcher = "java"`.
    pub target: String,
    /// How the target is launched.
    #[serde(default)]
    pub launcher: Launcher,
    /// Java binary used by the `java` launcher.
    #[serde(default = "default_java_bin")]
    pub java_bin: String,
    /// Extra arguments appended after the target.
    #[serde(default)]
    pub args: Vec<String>,
    /// Fail when the target is missing; otherwise the run is skipped.
    #[serde(default = "default_true")]
    pub fail_on_missing_target: bool,
    /// Input directory of the build step; must exist.
    pub input_dir: PathBuf,
    /// Output directory of the build step; created when missing.
    pub output_dir: PathBuf,
    /// Stream tunables.
    #[serde(default)]
    pub transport: TransportConfig,
}

impl RunnerConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// Relative directories are resolved against the current directory.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize directories.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Spawn settings derived from this configuration.
    #[must_use]
    pub fn spawn_config(&self) -> SpawnConfig {
        SpawnConfig {
            target: self.target.clone(),
            launcher: self.launcher,
            java_bin: self.java_bin.clone(),
            args: self.args.clone(),
            fail_on_missing_target: self.fail_on_missing_target,
            transport: TransportOptions {
                poll_interval: Duration::from_millis(self.transport.poll_interval_ms),
                max_line_bytes: self.transport.max_line_bytes,
            },
            drain_timeout: DRAIN_TIMEOUT,
        }
    }

    fn validate(&mut self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(AppError::Config("target must not be empty".into()));
        }

        if self.transport.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "transport.poll_interval_ms must be greater than zero".into(),
            ));
        }

        if self.transport.max_line_bytes == 0 {
            return Err(AppError::Config(
                "transport.max_line_bytes must be greater than zero".into(),
            ));
        }

        self.input_dir = self
            .input_dir
            .canonicalize()
            .map_err(|err| AppError::Config(format!("input_dir invalid: {err}")))?;
        if !self.input_dir.is_dir() {
            return Err(AppError::Config(format!(
                "input_dir is not a directory: {}",
                self.input_dir.display()
            )));
        }

        fs::create_dir_all(&self.output_dir)
            .map_err(|err| AppError::Config(format!("output_dir cannot be created: {err}")))?;
        self.output_dir = self
            .output_dir
            .canonicalize()
            .map_err(|err| AppError::Config(format!("output_dir invalid: {err}")))?;

        Ok(())
    }
}
