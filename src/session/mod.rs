//! Worker session: change data, cursors and the two stream tasks.
//!
//! - `state`: [`Session`] owning the [`ChangeSet`](crate::models::ChangeSet)
//!   and the per-scope cursors.
//! - `dispatcher`: primary-stream task serving requests and log pushes.
//! - `forwarder`: secondary-stream task forwarding lines at error severity.

pub mod dispatcher;
pub mod forwarder;
pub mod state;

pub use dispatcher::run_dispatcher;
pub use forwarder::run_forwarder;
pub use state::Session;
