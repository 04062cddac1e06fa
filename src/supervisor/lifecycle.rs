//! Worker lifecycle state machine.
//!
//! ```text
//! Spawning ─▶ Handshaking ─▶ Servicing ─▶ Draining ─▶ Terminated
//! ```
//!
//! 1. **Spawning**: resolve the target and launch it. A missing target fails
//!    the run, or skips it when configured non-fatal.
//! 2. **Handshaking**: write the eight handshake pairs before any stream task
//!    starts, so nothing else races on the worker's stdin.
//! 3. **Servicing**: the dispatcher (stdout) and forwarder (stderr) run as
//!    separate tasks while the supervisor waits for the process to exit.
//! 4. **Draining**: the `finished` token is cancelled and both tasks get one
//!    shared [`DRAIN_TIMEOUT`](super::DRAIN_TIMEOUT) budget to observe it.
//!    When the budget elapses the tasks are abandoned with a warning; trailing
//!    output may be lost.
//! 5. **Terminated**: exit code 0 is success, anything else fails the run.
//!    A worker still alive at this point is killed.

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::session::{run_dispatcher, run_forwarder, Session};
use crate::sink::LogSink;
use crate::supervisor::spawner::{
    resolve_command, spawn_worker, Resolution, SpawnConfig, WorkerConnection,
};
use crate::transport::{LineReader, LineWriter, TransportOptions};
use crate::{AppError, Result};

/// Successful end state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The worker ran and exited with code 0.
    Completed,
    /// The target was missing and the run was skipped.
    Skipped(String),
}

/// Resolve, spawn and supervise one worker serving `session`.
///
/// # Errors
///
/// - `AppError::Config` when the target is missing (and not configured as
///   skippable).
/// - `AppError::Io` when the worker cannot be spawned or waited on.
/// - `AppError::Protocol` when the handshake cannot be delivered.
/// - `AppError::WorkerExit` when the worker exits unsuccessfully.
pub async fn run_worker(
    config: &SpawnConfig,
    session: Session,
    sink: Arc<dyn LogSink>,
) -> Result<Outcome> {
    let command = match resolve_command(config)? {
        Resolution::Ready(command) => command,
        Resolution::Skip(reason) => return Ok(Outcome::Skipped(reason)),
    };
    let connection = spawn_worker(&command)?;
    let span = info_span!("worker", pid = connection.child.id());
    supervise(
        connection,
        session,
        sink,
        config.transport,
        config.drain_timeout,
    )
    .instrument(span)
    .await
}

/// Drive an already spawned worker from handshake to termination.
///
/// # Errors
///
/// See [`run_worker`].
pub async fn supervise(
    connection: WorkerConnection,
    session: Session,
    sink: Arc<dyn LogSink>,
    transport: TransportOptions,
    drain_timeout: Duration,
) -> Result<Outcome> {
    let WorkerConnection {
        mut child,
        stdin,
        stdout,
        stderr,
    } = connection;
    let finished = session.finished().clone();

    // ── Handshaking ─────────────────────────────────
    let handshake = session.handshake();
    let mut writer = LineWriter::new(stdin);
    if let Err(err) = writer.send_all(handshake.to_lines()).await {
        warn!(%err, "handshake could not be delivered, killing worker");
        kill(&mut child).await;
        return Err(AppError::Protocol(format!(
            "failed to deliver handshake: {err}"
        )));
    }
    info!(
        incremental = handshake.incremental,
        total = handshake.total,
        modified = handshake.modified,
        added = handshake.added,
        removed = handshake.removed,
        unchanged = handshake.unchanged,
        "handshake sent"
    );

    // ── Servicing ───────────────────────────────────
    let primary = LineReader::with_options(stdout, finished.clone(), transport);
    let secondary = LineReader::with_options(stderr, finished.clone(), transport);
    let dispatcher = tokio::spawn(
        run_dispatcher(session, primary, writer, Arc::clone(&sink)).in_current_span(),
    );
    let forwarder = tokio::spawn(run_forwarder(secondary, sink).in_current_span());

    let status = child.wait().await;

    // ── Draining ────────────────────────────────────
    finished.cancel();
    debug!("worker exited, draining stream tasks");
    drain(dispatcher, forwarder, drain_timeout).await;

    // ── Terminated ──────────────────────────────────
    if matches!(child.try_wait(), Ok(None)) {
        error!("worker did not terminate, killing it");
        kill(&mut child).await;
    }

    let status = status.map_err(|err| AppError::Io(format!("failed to wait for worker: {err}")))?;
    if status.success() {
        info!("worker completed");
        Ok(Outcome::Completed)
    } else {
        let err = AppError::WorkerExit(status.code());
        error!(%err, "worker failed");
        Err(err)
    }
}

/// Join both stream tasks under one shared budget.
async fn drain(
    dispatcher: JoinHandle<Result<()>>,
    forwarder: JoinHandle<Result<()>>,
    budget: Duration,
) {
    let dispatcher_abort = dispatcher.abort_handle();
    let forwarder_abort = forwarder.abort_handle();

    match tokio::time::timeout(budget, async { tokio::join!(dispatcher, forwarder) }).await {
        Ok((dispatched, forwarded)) => {
            report("dispatcher", dispatched);
            report("forwarder", forwarded);
        }
        Err(_elapsed) => {
            warn!(
                ?budget,
                "stream tasks did not finish within the drain budget, abandoning them"
            );
            dispatcher_abort.abort();
            forwarder_abort.abort();
        }
    }
}

fn report(task: &str, joined: std::result::Result<Result<()>, JoinError>) {
    match joined {
        Ok(Ok(())) => debug!(task, "stream task finished"),
        Ok(Err(err)) => warn!(task, %err, "stream task ended with an error"),
        Err(err) => warn!(task, %err, "stream task did not complete"),
    }
}

/// Best-effort kill; failures are logged, never escalated.
async fn kill(child: &mut Child) {
    if let Err(err) = child.kill().await {
        warn!(%err, "failed to kill worker");
    }
}
