//! Destination for worker log records.
//!
//! The host build system's logger is modelled as [`LogSink`]. Both stream
//! tasks of a session append to the same sink concurrently, hence the
//! `Send + Sync` bound.

use tracing::{error, info, trace, warn};

use crate::protocol::LogLevel;

/// Tracing target used by [`TracingSink`] for worker messages.
pub const WORKER_TARGET: &str = "dyntask::worker";

/// Receives log records produced by the worker.
pub trait LogSink: Send + Sync {
    /// Append one record.
    fn log(&self, level: LogLevel, message: &str);
}

/// Sink that re-emits worker records as `tracing` events under
/// [`WORKER_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Trace => trace!(target: WORKER_TARGET, "{message}"),
            LogLevel::Info => info!(target: WORKER_TARGET, "{message}"),
            LogLevel::Warn => warn!(target: WORKER_TARGET, "{message}"),
            LogLevel::Error => error!(target: WORKER_TARGET, "{message}"),
        }
    }
}
