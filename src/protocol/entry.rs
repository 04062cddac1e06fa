//! Encoding of data replies.
//!
//! The combined scope replies with `tag:path` lines; a category scope replies
//! with the bare absolute path. An empty line means the cursor is exhausted.

use std::path::PathBuf;

use crate::models::{ChangeCategory, ChangeEntry};
use crate::{AppError, Result};

/// Reply line signalling an exhausted cursor.
pub const EXHAUSTED: &str = "";

/// Encode `entry` as `tag:path` for the combined scope.
#[must_use]
pub fn encode_tagged(entry: &ChangeEntry) -> String {
    format!("{}:{}", entry.category().tag(), entry.path().display())
}

/// Encode `entry` as its bare path for a category scope.
#[must_use]
pub fn encode_path(entry: &ChangeEntry) -> String {
    entry.path().display().to_string()
}

/// Decode a `tag:path` line.
///
/// Only the first `:` separates the tag, so paths containing colons (drive
/// letters) survive.
///
/// # Errors
///
/// Returns [`AppError::Protocol`] if the separator is missing or the tag is
/// unknown.
pub fn decode_tagged(line: &str) -> Result<ChangeEntry> {
    let (tag, path) = line
        .split_once(':')
        .ok_or_else(|| AppError::Protocol(format!("entry line without tag: {line}")))?;
    let category = ChangeCategory::from_tag(tag)
        .ok_or_else(|| AppError::Protocol(format!("unknown entry tag: {tag}")))?;
    Ok(ChangeEntry::new(PathBuf::from(path), category))
}
