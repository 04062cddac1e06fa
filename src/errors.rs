//! Error types shared across the crate.

use std::fmt::{Display, Formatter};

/// Shared crate result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error enumeration covering every failure mode of a worker invocation.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure, including a missing
    /// worker target.
    Config(String),
    /// Wire protocol violation (handshake mismatch, malformed request,
    /// overlong line).
    Protocol(String),
    /// A change record carried more than one positive classification signal.
    Consistency(String),
    /// The worker process exited unsuccessfully. `None` means it was
    /// terminated by a signal.
    WorkerExit(Option<i32>),
    /// Stream or process I/O failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Consistency(msg) => write!(f, "consistency: {msg}"),
            Self::WorkerExit(Some(code)) => write!(f, "worker: exited with code {code}"),
            Self::WorkerExit(None) => write!(f, "worker: terminated by signal"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("invalid changes document: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
