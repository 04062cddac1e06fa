//! Worker requests.
//!
//! # Vocabulary
//!
//! | Line                          | Meaning                                  |
//! |-------------------------------|------------------------------------------|
//! | `all [category]`              | dump every remaining entry of the scope  |
//! | `next [category]`             | one entry, or an empty line if exhausted |
//! | `trace\|info\|warn\|error [n]` | log push of the following `n` lines     |
//!
//! A missing category selects the combined scope. Categories are `modified`,
//! `added`, `removed` and `unchanged`.

use std::fmt::{Display, Formatter};

use tracing::warn;

use crate::models::ChangeCategory;
use crate::{AppError, Result};

/// Largest line count a log push may announce.
pub const MAX_LOG_LINES: usize = 65_536;

/// Scope of a data request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Every entry, replied as `tag:path`.
    Combined,
    /// Entries of one category, replied as bare paths.
    Only(ChangeCategory),
}

/// Severity of a worker log push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Fine-grained diagnostics.
    Trace,
    /// Informational message.
    Info,
    /// Recoverable problem.
    Warn,
    /// Failure.
    Error,
}

impl LogLevel {
    /// Wire token of the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Parse a wire token.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "trace" => Some(Self::Trace),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// `all [category]`.
    All(Scope),
    /// `next [category]`.
    Next(Scope),
    /// Log push; `lines` following lines form the message.
    Log {
        /// Severity of the message.
        level: LogLevel,
        /// Number of message lines that follow.
        lines: usize,
    },
}

impl Request {
    /// Parse a request line.
    ///
    /// Tokens beyond the second are logged and ignored.
    ///
    /// # Errors
    ///
    /// - [`AppError::Protocol`]`("empty request")` for a blank line.
    /// - [`AppError::Protocol`]`("unknown command …")` for an unrecognised
    ///   first token.
    /// - [`AppError::Protocol`]`("unknown category …")` for a bad scope.
    /// - [`AppError::Protocol`]`("invalid log line count …")` when the count is
    ///   not an integer in `1..=`[`MAX_LOG_LINES`].
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.split(' ');
        let command = tokens.next().unwrap_or_default();
        if command.is_empty() {
            return Err(AppError::Protocol("empty request".into()));
        }
        let argument = tokens.next();
        if tokens.next().is_some() {
            warn!(line, "request has trailing tokens, ignoring them");
        }

        match command {
            "all" => Ok(Self::All(parse_scope(command, argument)?)),
            "next" => Ok(Self::Next(parse_scope(command, argument)?)),
            other => match LogLevel::parse(other) {
                Some(level) => Ok(Self::Log {
                    level,
                    lines: parse_line_count(argument)?,
                }),
                None => Err(AppError::Protocol(format!("unknown command: {line}"))),
            },
        }
    }

    /// Encode as a request line (without the terminator).
    #[must_use]
    pub fn to_line(&self) -> String {
        match self {
            Self::All(scope) => scoped("all", *scope),
            Self::Next(scope) => scoped("next", *scope),
            Self::Log { level, lines: 1 } => level.as_str().to_owned(),
            Self::Log { level, lines } => format!("{level} {lines}"),
        }
    }
}

/// Encode a log push: the header line followed by the message lines.
///
/// Single-line messages omit the count.
#[must_use]
pub fn encode_log(level: LogLevel, message: &str) -> Vec<String> {
    let body: Vec<&str> = message.split('\n').collect();
    let header = Request::Log {
        level,
        lines: body.len(),
    }
    .to_line();
    std::iter::once(header)
        .chain(body.into_iter().map(str::to_owned))
        .collect()
}

fn scoped(command: &str, scope: Scope) -> String {
    match scope {
        Scope::Combined => command.to_owned(),
        Scope::Only(category) => format!("{command} {}", category.token()),
    }
}

fn parse_scope(command: &str, argument: Option<&str>) -> Result<Scope> {
    match argument {
        None => Ok(Scope::Combined),
        Some(token) => ChangeCategory::from_token(token)
            .map(Scope::Only)
            .ok_or_else(|| AppError::Protocol(format!("unknown category: {command} {token}"))),
    }
}

fn parse_line_count(argument: Option<&str>) -> Result<usize> {
    let Some(raw) = argument else {
        return Ok(1);
    };
    match raw.parse::<usize>() {
        Ok(count) if (1..=MAX_LOG_LINES).contains(&count) => Ok(count),
        _ => Err(AppError::Protocol(format!("invalid log line count: {raw}"))),
    }
}
