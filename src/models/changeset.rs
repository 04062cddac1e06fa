//! Classified change list with cached per-category views.

use std::path::Path;

use crate::models::change::{classify, ChangeCategory, ChangeEntry, ChangeRecord};
use crate::{AppError, Result};

/// The full classified change list of one invocation.
///
/// Views are index lists into `entries`, computed once at construction. The
/// set exposes no mutation, so views and counts cannot drift during a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: Vec<ChangeEntry>,
    added: Vec<usize>,
    modified: Vec<usize>,
    removed: Vec<usize>,
    unchanged: Vec<usize>,
}

impl ChangeSet {
    /// Build a change set from already classified entries, keeping their order.
    #[must_use]
    pub fn new(entries: Vec<ChangeEntry>) -> Self {
        let mut set = Self {
            entries,
            ..Self::default()
        };
        for (index, entry) in set.entries.iter().enumerate() {
            match entry.category() {
                ChangeCategory::Added => set.added.push(index),
                ChangeCategory::Modified => set.modified.push(index),
                ChangeCategory::Removed => set.removed.push(index),
                ChangeCategory::Unchanged => set.unchanged.push(index),
            }
        }
        set
    }

    /// Classify upstream records and build a change set from them.
    ///
    /// Relative paths are made absolute against the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Consistency`] on the first record with conflicting
    /// signals, or [`AppError::Io`] if a path cannot be made absolute.
    pub fn from_records(records: &[ChangeRecord]) -> Result<Self> {
        let entries = records
            .iter()
            .map(|record| {
                let category = classify(record.added, record.modified, record.removed)
                    .map_err(|err| match err {
                        AppError::Consistency(msg) => AppError::Consistency(format!(
                            "{}: {msg}",
                            record.path.display()
                        )),
                        other => other,
                    })?;
                Ok(ChangeEntry::new(absolute(&record.path)?, category))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(entries))
    }

    /// All entries in classification order.
    #[must_use]
    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries in `category`.
    #[must_use]
    pub fn count(&self, category: ChangeCategory) -> usize {
        self.indices(category).len()
    }

    /// Entry at `position` within the view of `category`.
    #[must_use]
    pub fn get(&self, category: ChangeCategory, position: usize) -> Option<&ChangeEntry> {
        self.indices(category)
            .get(position)
            .map(|&index| &self.entries[index])
    }

    /// Entries of `category`, in their original relative order.
    pub fn view(&self, category: ChangeCategory) -> impl Iterator<Item = &ChangeEntry> + '_ {
        self.indices(category).iter().map(|&index| &self.entries[index])
    }

    /// Added entries followed by modified entries.
    ///
    /// The two groups are concatenated, not merged by arrival order; workers
    /// rely on this ordering.
    pub fn out_of_date(&self) -> impl Iterator<Item = &ChangeEntry> + '_ {
        self.view(ChangeCategory::Added)
            .chain(self.view(ChangeCategory::Modified))
    }

    /// Number of out-of-date (added plus modified) entries.
    #[must_use]
    pub fn out_of_date_count(&self) -> usize {
        self.added.len() + self.modified.len()
    }

    fn indices(&self, category: ChangeCategory) -> &[usize] {
        match category {
            ChangeCategory::Added => &self.added,
            ChangeCategory::Modified => &self.modified,
            ChangeCategory::Removed => &self.removed,
            ChangeCategory::Unchanged => &self.unchanged,
        }
    }
}

fn absolute(path: &Path) -> Result<std::path::PathBuf> {
    std::path::absolute(path)
        .map_err(|err| AppError::Io(format!("cannot resolve {}: {err}", path.display())))
}
