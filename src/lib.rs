#![forbid(unsafe_code)]

//! `dyntask` — hand a classified change list to a supervised worker process.
//!
//! The orchestrator side spawns the worker, sends the handshake and serves
//! `next`/`all` requests and log pushes until the worker exits. The worker
//! side is available as [`client`].

pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod supervisor;
pub mod transport;

pub use config::RunnerConfig;
pub use errors::{AppError, Result};
