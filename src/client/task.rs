//! Static worker contract.
//!
//! A worker binary implements [`WorkerTask`] and calls [`run_task`] from
//! `main`. The orchestrator never inspects the worker: the constructor shape
//! and the `execute` signature are the whole contract, checked at compile
//! time.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::client::WorkerClient;
use crate::protocol::LogLevel;
use crate::Result;

/// A unit of build work executed inside the worker process.
pub trait WorkerTask: Sized {
    /// Construct the task for the announced directories.
    fn create(input_dir: PathBuf, output_dir: PathBuf) -> Self;

    /// Run the task, pulling change data through `client`.
    ///
    /// # Errors
    ///
    /// Any error fails the worker with a non-zero exit code.
    fn execute<R: BufRead, W: Write>(&mut self, client: &mut WorkerClient<R, W>) -> Result<()>;
}

/// Run `T` over this process's stdin/stdout and map the result to an exit code.
///
/// Failures are pushed to the orchestrator as an error log and written to
/// stderr.
#[must_use]
pub fn run_task<T: WorkerTask>() -> ExitCode {
    let stdin = std::io::stdin().lock();
    let stdout = std::io::stdout().lock();
    match drive::<T, _, _>(stdin, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("worker task failed: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Connect over `reader`/`writer`, build `T` from the handshake and execute it.
///
/// # Errors
///
/// Returns handshake failures and the task's own error.
pub fn drive<T, R, W>(reader: R, writer: W) -> Result<()>
where
    T: WorkerTask,
    R: BufRead,
    W: Write,
{
    let mut client = WorkerClient::connect(reader, writer)?;
    let handshake = client.handshake().clone();
    let mut task = T::create(handshake.input_dir, handshake.output_dir);
    if let Err(err) = task.execute(&mut client) {
        if let Err(log_err) = client.log(LogLevel::Error, &err.to_string()) {
            eprintln!("failed to report task error: {log_err}");
        }
        return Err(err);
    }
    Ok(())
}
