//! Session handshake.
//!
//! Before the worker sends its first request, the orchestrator writes eight
//! label/value line pairs in a fixed order:
//!
//! | Label             | Value                          |
//! |-------------------|--------------------------------|
//! | `incremental`     | `true` / `false`               |
//! | `input dir`       | absolute path                  |
//! | `output dir`      | absolute path                  |
//! | `total count`     | number of entries              |
//! | `total modified`  | number of modified entries     |
//! | `total added`     | number of added entries        |
//! | `total removed`   | number of removed entries      |
//! | `total unchanged` | number of unchanged entries    |
//!
//! The reader checks every label against the expected literal. A mismatch is
//! fatal: the ordering doubles as the protocol version check and no
//! resynchronisation is attempted.

use std::path::PathBuf;
use std::str::FromStr;

use crate::models::{ChangeCategory, ChangeSet};
use crate::protocol::Scope;
use crate::{AppError, Result};

/// Handshake labels in wire order.
pub const LABELS: [&str; 8] = [
    "incremental",
    "input dir",
    "output dir",
    "total count",
    "total modified",
    "total added",
    "total removed",
    "total unchanged",
];

/// Values exchanged in the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Whether the host build runs incrementally.
    pub incremental: bool,
    /// Input directory of the build step.
    pub input_dir: PathBuf,
    /// Output directory of the build step.
    pub output_dir: PathBuf,
    /// Total number of entries.
    pub total: usize,
    /// Number of modified entries.
    pub modified: usize,
    /// Number of added entries.
    pub added: usize,
    /// Number of removed entries.
    pub removed: usize,
    /// Number of unchanged entries.
    pub unchanged: usize,
}

impl Handshake {
    /// Build the handshake describing `changes`.
    #[must_use]
    pub fn describe(
        incremental: bool,
        input_dir: PathBuf,
        output_dir: PathBuf,
        changes: &ChangeSet,
    ) -> Self {
        Self {
            incremental,
            input_dir,
            output_dir,
            total: changes.len(),
            modified: changes.count(ChangeCategory::Modified),
            added: changes.count(ChangeCategory::Added),
            removed: changes.count(ChangeCategory::Removed),
            unchanged: changes.count(ChangeCategory::Unchanged),
        }
    }

    /// Number of entries announced for `scope`.
    #[must_use]
    pub fn count(&self, scope: Scope) -> usize {
        match scope {
            Scope::Combined => self.total,
            Scope::Only(ChangeCategory::Modified) => self.modified,
            Scope::Only(ChangeCategory::Added) => self.added,
            Scope::Only(ChangeCategory::Removed) => self.removed,
            Scope::Only(ChangeCategory::Unchanged) => self.unchanged,
        }
    }

    /// Encode as the sixteen wire lines, labels and values interleaved.
    #[must_use]
    pub fn to_lines(&self) -> Vec<String> {
        let values = [
            self.incremental.to_string(),
            self.input_dir.display().to_string(),
            self.output_dir.display().to_string(),
            self.total.to_string(),
            self.modified.to_string(),
            self.added.to_string(),
            self.removed.to_string(),
            self.unchanged.to_string(),
        ];
        LABELS
            .iter()
            .zip(values)
            .flat_map(|(label, value)| [(*label).to_owned(), value])
            .collect()
    }

    /// Decode a handshake by pulling lines from `next_line`.
    ///
    /// `next_line` returns `Ok(None)` at end of stream.
    ///
    /// # Errors
    ///
    /// - [`AppError::Protocol`]`("handshake label mismatch …")` when a label
    ///   differs from the expected literal.
    /// - [`AppError::Protocol`]`("handshake truncated …")` on early end of stream.
    /// - [`AppError::Protocol`]`("invalid handshake value …")` when a value does
    ///   not parse.
    /// - Any error returned by `next_line`.
    pub fn decode<F>(mut next_line: F) -> Result<Self>
    where
        F: FnMut() -> Result<Option<String>>,
    {
        let mut values = Vec::with_capacity(LABELS.len());
        for expected in LABELS {
            let label = pull(&mut next_line, expected)?;
            if label != expected {
                return Err(AppError::Protocol(format!(
                    "handshake label mismatch: expected '{expected}', got '{label}'"
                )));
            }
            values.push(pull(&mut next_line, expected)?);
        }

        Ok(Self {
            incremental: parse_value(LABELS[0], &values[0])?,
            input_dir: PathBuf::from(&values[1]),
            output_dir: PathBuf::from(&values[2]),
            total: parse_value(LABELS[3], &values[3])?,
            modified: parse_value(LABELS[4], &values[4])?,
            added: parse_value(LABELS[5], &values[5])?,
            removed: parse_value(LABELS[6], &values[6])?,
            unchanged: parse_value(LABELS[7], &values[7])?,
        })
    }
}

fn pull<F>(next_line: &mut F, label: &str) -> Result<String>
where
    F: FnMut() -> Result<Option<String>>,
{
    next_line()?.ok_or_else(|| AppError::Protocol(format!("handshake truncated at '{label}'")))
}

fn parse_value<T: FromStr>(label: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| AppError::Protocol(format!("invalid handshake value for '{label}': {raw}")))
}
