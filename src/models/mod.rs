//! Domain model module declarations.

pub mod change;
pub mod changeset;

pub use change::{classify, ChangeCategory, ChangeDocument, ChangeEntry, ChangeRecord};
pub use changeset::ChangeSet;
