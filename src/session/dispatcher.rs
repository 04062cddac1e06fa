//! Primary-stream dispatcher task.
//!
//! Reads request lines from the worker's stdout in arrival order and either
//! writes the data reply to the worker's stdin or forwards a log push to the
//! sink.
//!
//! # Failure policy
//!
//! | Situation                        | Handling                              |
//! |----------------------------------|---------------------------------------|
//! | unknown command or category      | logged, no reply, servicing continues |
//! | malformed log line count         | logged, push dropped                  |
//! | `all`/`next` after worker exit   | logged as dropped, no reply           |
//! | reply write fails                | logged, servicing continues           |
//! | read error (overlong line, I/O)  | writer closed with cause, task ends   |

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, warn};

use crate::protocol::{LogLevel, Request, Scope};
use crate::session::Session;
use crate::sink::LogSink;
use crate::transport::{LineReader, LineWriter};
use crate::Result;

/// Serve worker requests until the primary stream ends.
///
/// The stream ends when the worker closes its stdout, or when the session's
/// `finished` signal is set and no partial line is buffered. The writer is
/// closed before returning.
///
/// # Errors
///
/// Returns the reader's error when the primary stream fails. Protocol
/// violations in individual requests are never returned.
pub async fn run_dispatcher<R, W>(
    mut session: Session,
    mut reader: LineReader<R>,
    mut writer: LineWriter<W>,
    sink: Arc<dyn LogSink>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let line = match reader.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "dispatcher: primary stream failed, stopping");
                writer.close(Some(&err)).await;
                return Err(err);
            }
        };
        debug!(line = %line, "dispatcher: received");

        match Request::parse(&line) {
            Ok(Request::Log { level, lines }) => {
                if let Err(err) = forward_log(&mut reader, sink.as_ref(), level, lines).await {
                    warn!(%err, "dispatcher: primary stream failed inside a log block");
                    writer.close(Some(&err)).await;
                    return Err(err);
                }
            }
            Ok(Request::All(scope)) => {
                if accept_data_request(&session, &line) {
                    let reply = session.all(scope);
                    write_reply(&mut writer, scope, &reply).await;
                }
            }
            Ok(Request::Next(scope)) => {
                if accept_data_request(&session, &line) {
                    let reply = session.next(scope);
                    write_reply(&mut writer, scope, std::slice::from_ref(&reply)).await;
                }
            }
            Err(err) if line.is_empty() => {
                warn!(%err, "dispatcher: received empty line");
            }
            Err(err) => {
                error!(%err, line = %line, "dispatcher: invalid request, skipping");
            }
        }
    }

    debug!("dispatcher: primary stream closed");
    writer.close(None).await;
    Ok(())
}

/// Late requests are dropped: nothing reads replies once the worker exited.
fn accept_data_request(session: &Session, line: &str) -> bool {
    if session.is_finished() {
        warn!(request = line, "dispatcher: dropping request received after worker exit");
        return false;
    }
    true
}

async fn write_reply<W>(writer: &mut LineWriter<W>, scope: Scope, lines: &[String])
where
    W: AsyncWrite + Unpin,
{
    if let Err(err) = writer.send_all(lines).await {
        warn!(%err, ?scope, "dispatcher: failed to deliver reply");
    }
}

/// Read the `count` message lines of a log push and forward them as one record.
///
/// If the stream ends inside the block, the lines received so far are
/// forwarded with a warning.
async fn forward_log<R>(
    reader: &mut LineReader<R>,
    sink: &dyn LogSink,
    level: LogLevel,
    count: usize,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut message = Vec::new();
    let mut failure = None;
    while message.len() < count {
        match reader.next_line().await {
            Ok(Some(line)) => message.push(line),
            Ok(None) => break,
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }

    if message.len() < count {
        warn!(
            %level,
            expected = count,
            received = message.len(),
            "dispatcher: primary stream ended inside a log block"
        );
    }
    if !message.is_empty() {
        sink.log(level, &message.join("\n"));
    }

    failure.map_or(Ok(()), Err)
}
