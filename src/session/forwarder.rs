//! Secondary-stream forwarder task.
//!
//! Every line the worker writes to stderr is forwarded to the sink at error
//! severity. The stream carries no requests.

use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::{debug, warn};

use crate::protocol::LogLevel;
use crate::sink::LogSink;
use crate::transport::LineReader;
use crate::Result;

/// Forward lines from `reader` until the secondary stream ends.
///
/// # Errors
///
/// Returns the reader's error when the stream fails.
pub async fn run_forwarder<R>(mut reader: LineReader<R>, sink: Arc<dyn LogSink>) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        match reader.next_line().await {
            Ok(Some(line)) => sink.log(LogLevel::Error, &line),
            Ok(None) => {
                debug!("forwarder: secondary stream closed");
                return Ok(());
            }
            Err(err) => {
                warn!(%err, "forwarder: secondary stream failed, stopping");
                return Err(err);
            }
        }
    }
}
