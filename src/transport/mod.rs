//! Duplex line transport over worker stdio.
//!
//! - `reader`: byte stream to line sequence, polled with a short backoff so
//!   the stop signal is observed between polls.
//! - `writer`: line sink that terminates and flushes every send.

use std::time::Duration;

use crate::protocol::codec::MAX_LINE_BYTES;

pub mod reader;
pub mod writer;

pub use reader::LineReader;
pub use writer::LineWriter;

/// Backoff between availability checks of a reader.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Tunables shared by both stream readers of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Longest wait for a complete line before the stop signal is checked.
    pub poll_interval: Duration,
    /// Maximum accepted line length in bytes.
    pub max_line_bytes: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            max_line_bytes: MAX_LINE_BYTES,
        }
    }
}
