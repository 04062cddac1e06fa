//! Worker process supervision.
//!
//! - `spawner`: target resolution and process launch with piped stdio.
//! - `lifecycle`: the `Spawning → Handshaking → Servicing → Draining →
//!   Terminated` state machine.

pub mod lifecycle;
pub mod spawner;

pub use lifecycle::{run_worker, Outcome};
pub use spawner::{Launcher, SpawnConfig, DRAIN_TIMEOUT};
