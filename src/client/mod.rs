//! Worker-side protocol client.
//!
//! A worker reads the handshake from its stdin, then pulls entries with
//! `next`/`all` requests on its stdout and pushes log messages on the same
//! stream. [`WorkerClient`] implements that half of the protocol over any
//! blocking reader/writer pair; [`task`] adds the [`WorkerTask`] contract and
//! a `main` helper.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::models::ChangeEntry;
use crate::protocol::entry::decode_tagged;
use crate::protocol::request::encode_log;
use crate::protocol::{Handshake, LogLevel, Request, Scope};
use crate::{AppError, Result};

pub mod task;

pub use task::{run_task, WorkerTask};

/// Blocking client for the worker side of a session.
#[derive(Debug)]
pub struct WorkerClient<R, W> {
    reader: R,
    writer: W,
    handshake: Handshake,
    consumed: HashMap<Scope, usize>,
}

impl<R, W> WorkerClient<R, W>
where
    R: BufRead,
    W: Write,
{
    /// Read and validate the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] when a handshake label does not match or
    /// the stream ends early, and [`AppError::Io`] on read failure.
    pub fn connect(mut reader: R, writer: W) -> Result<Self> {
        let handshake = Handshake::decode(|| read_line(&mut reader))?;
        Ok(Self {
            reader,
            writer,
            handshake,
            consumed: HashMap::new(),
        })
    }

    /// Values announced by the orchestrator.
    #[must_use]
    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Whether the host build runs incrementally.
    #[must_use]
    pub fn is_incremental(&self) -> bool {
        self.handshake.incremental
    }

    /// Input directory of the build step.
    #[must_use]
    pub fn input_dir(&self) -> &Path {
        &self.handshake.input_dir
    }

    /// Output directory of the build step.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.handshake.output_dir
    }

    /// Entries of `scope` not yet received by this client.
    #[must_use]
    pub fn remaining(&self, scope: Scope) -> usize {
        self.handshake
            .count(scope)
            .saturating_sub(self.consumed.get(&scope).copied().unwrap_or_default())
    }

    /// Request the next entry of `scope`; `None` once exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] on stream failure and [`AppError::Protocol`]
    /// for an undecodable reply or a closed stream.
    pub fn next(&mut self, scope: Scope) -> Result<Option<ChangeEntry>> {
        self.send(&[Request::Next(scope).to_line()])?;
        let line = self.read_reply()?;
        if line.is_empty() {
            return Ok(None);
        }
        *self.consumed.entry(scope).or_default() += 1;
        decode_reply(scope, &line).map(Some)
    }

    /// Request every remaining entry of `scope`.
    ///
    /// The reply carries no terminator; the number of lines to read follows
    /// from the handshake counts minus the entries already received.
    ///
    /// # Errors
    ///
    /// Same as [`WorkerClient::next`].
    pub fn all(&mut self, scope: Scope) -> Result<Vec<ChangeEntry>> {
        let expected = self.remaining(scope);
        self.send(&[Request::All(scope).to_line()])?;
        let mut entries = Vec::new();
        for _ in 0..expected {
            let line = self.read_reply()?;
            entries.push(decode_reply(scope, &line)?);
        }
        self.consumed.insert(scope, self.handshake.count(scope));
        Ok(entries)
    }

    /// Send `request` without reading its reply.
    ///
    /// Cursor bookkeeping is not updated, so [`WorkerClient::remaining`] and
    /// [`WorkerClient::all`] are unreliable for the scope afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the stream is closed.
    pub fn submit(&mut self, request: Request) -> Result<()> {
        self.send(&[request.to_line()])
    }

    /// Push a (possibly multi-line) log message to the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the stream is closed.
    pub fn log(&mut self, level: LogLevel, message: &str) -> Result<()> {
        self.send(&encode_log(level, message))
    }

    /// Push a trace message.
    ///
    /// # Errors
    ///
    /// See [`WorkerClient::log`].
    pub fn trace(&mut self, message: &str) -> Result<()> {
        self.log(LogLevel::Trace, message)
    }

    /// Push an info message.
    ///
    /// # Errors
    ///
    /// See [`WorkerClient::log`].
    pub fn info(&mut self, message: &str) -> Result<()> {
        self.log(LogLevel::Info, message)
    }

    /// Push a warning.
    ///
    /// # Errors
    ///
    /// See [`WorkerClient::log`].
    pub fn warn(&mut self, message: &str) -> Result<()> {
        self.log(LogLevel::Warn, message)
    }

    /// Push an error message.
    ///
    /// # Errors
    ///
    /// See [`WorkerClient::log`].
    pub fn error(&mut self, message: &str) -> Result<()> {
        self.log(LogLevel::Error, message)
    }

    fn send(&mut self, lines: &[String]) -> Result<()> {
        for line in lines {
            self.writer.write_all(line.as_bytes())?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn read_reply(&mut self) -> Result<String> {
        read_line(&mut self.reader)?
            .ok_or_else(|| AppError::Protocol("orchestrator closed the stream".into()))
    }
}

fn decode_reply(scope: Scope, line: &str) -> Result<ChangeEntry> {
    match scope {
        Scope::Combined => decode_tagged(line),
        Scope::Only(category) => Ok(ChangeEntry::new(line, category)),
    }
}

/// One line without its `\n`; `None` at end of stream.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    if line.ends_with('\n') {
        line.pop();
    }
    Ok(Some(line))
}
