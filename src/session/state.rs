//! Session state.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::models::{ChangeCategory, ChangeSet};
use crate::protocol::entry::{encode_path, encode_tagged, EXHAUSTED};
use crate::protocol::{Handshake, Scope};

/// Read positions, one per scope. Only ever advanced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cursors {
    all: usize,
    modified: usize,
    added: usize,
    removed: usize,
    unchanged: usize,
}

impl Cursors {
    fn slot(&mut self, scope: Scope) -> &mut usize {
        match scope {
            Scope::Combined => &mut self.all,
            Scope::Only(ChangeCategory::Modified) => &mut self.modified,
            Scope::Only(ChangeCategory::Added) => &mut self.added,
            Scope::Only(ChangeCategory::Removed) => &mut self.removed,
            Scope::Only(ChangeCategory::Unchanged) => &mut self.unchanged,
        }
    }
}

/// State of one worker invocation.
///
/// The change set and cursors are owned by the primary-stream dispatcher; the
/// `finished` token is the only state shared with the supervisor and the
/// forwarder. It is cancelled once, when the worker process exits.
#[derive(Debug)]
pub struct Session {
    incremental: bool,
    input_dir: PathBuf,
    output_dir: PathBuf,
    changes: ChangeSet,
    cursors: Cursors,
    finished: CancellationToken,
}

impl Session {
    /// Create a session over `changes` with fresh cursors.
    #[must_use]
    pub fn new(
        incremental: bool,
        input_dir: PathBuf,
        output_dir: PathBuf,
        changes: ChangeSet,
        finished: CancellationToken,
    ) -> Self {
        Self {
            incremental,
            input_dir,
            output_dir,
            changes,
            cursors: Cursors::default(),
            finished,
        }
    }

    /// Handshake announcing this session to the worker.
    #[must_use]
    pub fn handshake(&self) -> Handshake {
        Handshake::describe(
            self.incremental,
            self.input_dir.clone(),
            self.output_dir.clone(),
            &self.changes,
        )
    }

    /// Handle to the `finished` signal.
    #[must_use]
    pub fn finished(&self) -> &CancellationToken {
        &self.finished
    }

    /// Whether the worker has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }

    /// Reply line for `next <scope>`: the next entry, or [`EXHAUSTED`].
    ///
    /// Once exhausted, every further call returns [`EXHAUSTED`] again.
    pub fn next(&mut self, scope: Scope) -> String {
        let position = *self.cursors.slot(scope);
        match self.encode_at(scope, position) {
            Some(line) => {
                *self.cursors.slot(scope) = position + 1;
                line
            }
            None => EXHAUSTED.to_owned(),
        }
    }

    /// Reply lines for `all <scope>`: every entry after the cursor.
    ///
    /// Moves the cursor to the end of the scope.
    pub fn all(&mut self, scope: Scope) -> Vec<String> {
        let mut lines = Vec::new();
        let mut position = *self.cursors.slot(scope);
        while let Some(line) = self.encode_at(scope, position) {
            lines.push(line);
            position += 1;
        }
        *self.cursors.slot(scope) = position;
        lines
    }

    fn encode_at(&self, scope: Scope, position: usize) -> Option<String> {
        match scope {
            Scope::Combined => self.changes.entries().get(position).map(encode_tagged),
            Scope::Only(category) => self.changes.get(category, position).map(encode_path),
        }
    }
}
