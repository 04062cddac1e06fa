//! Classified file-system change records.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

/// Classification of one file-system change.
///
/// Exactly one category applies to an entry; [`classify`] enforces this when
/// converting upstream signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeCategory {
    /// File appeared since the previous build.
    Added,
    /// File content changed since the previous build.
    Modified,
    /// File disappeared since the previous build.
    Removed,
    /// File is tracked but unchanged.
    Unchanged,
}

impl ChangeCategory {
    /// All categories in handshake order (modified, added, removed, unchanged).
    pub const ALL: [Self; 4] = [Self::Modified, Self::Added, Self::Removed, Self::Unchanged];

    /// Short tag used in `tag:path` lines of the combined scope.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Added => "add",
            Self::Modified => "mod",
            Self::Removed => "rem",
            Self::Unchanged => "none",
        }
    }

    /// Parse a short `tag:path` tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }

    /// Request token naming this category (`all added`, `next removed`, …).
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
            Self::Unchanged => "unchanged",
        }
    }

    /// Parse a request category token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.token() == token)
    }
}

impl Display for ChangeCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Derive a category from the three independent upstream signals.
///
/// Precedence is added, then modified, then removed; with no signal the entry
/// is unchanged.
///
/// # Errors
///
/// Returns [`AppError::Consistency`] when more than one signal is set. This is
/// fatal for the whole invocation.
pub fn classify(is_added: bool, is_modified: bool, is_removed: bool) -> Result<ChangeCategory> {
    let positives = [is_added, is_modified, is_removed]
        .into_iter()
        .filter(|s| *s)
        .count();
    if positives > 1 {
        return Err(AppError::Consistency(format!(
            "conflicting change signals: added={is_added} modified={is_modified} \
             removed={is_removed}"
        )));
    }

    Ok(if is_added {
        ChangeCategory::Added
    } else if is_modified {
        ChangeCategory::Modified
    } else if is_removed {
        ChangeCategory::Removed
    } else {
        ChangeCategory::Unchanged
    })
}

/// One classified file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    path: PathBuf,
    category: ChangeCategory,
}

impl ChangeEntry {
    /// Create an entry for `path` in `category`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, category: ChangeCategory) -> Self {
        Self {
            path: path.into(),
            category,
        }
    }

    /// Absolute path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Category of the change.
    #[must_use]
    pub const fn category(&self) -> ChangeCategory {
        self.category
    }
}

/// One upstream change record as delivered by the host build system.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ChangeRecord {
    /// File path; relative paths are resolved against the working directory.
    pub path: PathBuf,
    /// File was added.
    #[serde(default)]
    pub added: bool,
    /// File was modified.
    #[serde(default)]
    pub modified: bool,
    /// File was removed.
    #[serde(default)]
    pub removed: bool,
}

/// Document handed to the orchestrator CLI: the classified change list of one
/// build step.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ChangeDocument {
    /// Whether the host build runs incrementally.
    #[serde(default)]
    pub incremental: bool,
    /// Change records in classification order.
    #[serde(default)]
    pub changes: Vec<ChangeRecord>,
}

impl ChangeDocument {
    /// Parse a change document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the JSON is malformed.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
