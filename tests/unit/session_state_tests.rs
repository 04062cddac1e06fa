//! Unit tests for session cursors and replies.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use dyntask::models::{ChangeCategory, ChangeEntry, ChangeSet};
use dyntask::protocol::Scope;
use dyntask::session::Session;

/// 2 modified, 1 added, 0 removed, 3 unchanged.
fn scenario_a() -> Session {
    let changes = ChangeSet::new(vec![
        ChangeEntry::new("/w/m1", ChangeCategory::Modified),
        ChangeEntry::new("/w/u1", ChangeCategory::Unchanged),
        ChangeEntry::new("/w/a1", ChangeCategory::Added),
        ChangeEntry::new("/w/u2", ChangeCategory::Unchanged),
        ChangeEntry::new("/w/m2", ChangeCategory::Modified),
        ChangeEntry::new("/w/u3", ChangeCategory::Unchanged),
    ]);
    Session::new(
        false,
        PathBuf::from("/w/in"),
        PathBuf::from("/w/out"),
        changes,
        CancellationToken::new(),
    )
}

const MODIFIED: Scope = Scope::Only(ChangeCategory::Modified);
const REMOVED: Scope = Scope::Only(ChangeCategory::Removed);
const UNCHANGED: Scope = Scope::Only(ChangeCategory::Unchanged);

#[test]
fn scenario_a_handshake_reports_six_entries() {
    assert_eq!(scenario_a().handshake().total, 6);
}

#[test]
fn scenario_a_all_modified_returns_exactly_the_modified_paths() {
    let mut session = scenario_a();
    assert_eq!(session.all(MODIFIED), vec!["/w/m1", "/w/m2"]);
}

#[test]
fn next_exhausts_after_n_calls_and_stays_exhausted() {
    let mut session = scenario_a();
    assert_eq!(session.next(UNCHANGED), "/w/u1");
    assert_eq!(session.next(UNCHANGED), "/w/u2");
    assert_eq!(session.next(UNCHANGED), "/w/u3");
    for _ in 0..3 {
        assert_eq!(session.next(UNCHANGED), "");
    }
}

#[test]
fn scenario_b_next_removed_on_empty_category_is_repeatedly_empty() {
    let mut session = scenario_a();
    assert_eq!(session.next(REMOVED), "");
    assert_eq!(session.next(REMOVED), "");
}

#[test]
fn combined_scope_replies_with_tagged_lines_in_arrival_order() {
    let mut session = scenario_a();
    assert_eq!(session.next(Scope::Combined), "mod:/w/m1");
    assert_eq!(
        session.all(Scope::Combined),
        vec!["none:/w/u1", "add:/w/a1", "none:/w/u2", "mod:/w/m2", "none:/w/u3"]
    );
    assert_eq!(session.next(Scope::Combined), "");
}

#[test]
fn all_returns_only_remaining_entries_and_consumes_them() {
    let mut session = scenario_a();
    assert_eq!(session.next(MODIFIED), "/w/m1");
    assert_eq!(session.all(MODIFIED), vec!["/w/m2"]);
    assert!(session.all(MODIFIED).is_empty());
    assert_eq!(session.next(MODIFIED), "");
}

#[test]
fn cursors_are_independent_per_scope() {
    let mut session = scenario_a();
    assert_eq!(session.next(MODIFIED), "/w/m1");
    assert_eq!(session.next(Scope::Combined), "mod:/w/m1");
    assert_eq!(session.next(MODIFIED), "/w/m2");
    assert_eq!(session.next(Scope::Combined), "none:/w/u1");
}

#[test]
fn finished_follows_the_shared_token() {
    let session = scenario_a();
    assert!(!session.is_finished());
    session.finished().clone().cancel();
    assert!(session.is_finished());
}
