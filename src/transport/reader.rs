//! Line reader.
//!
//! Wraps a [`FramedRead`] over [`LineCodec`]. A line whose bytes arrive over
//! several reads stays buffered until its `\n` arrives. Each poll waits at
//! most [`TransportOptions::poll_interval`] for a complete line; when the wait
//! elapses the reader checks the stop signal and ends the sequence only if no
//! partial line is buffered, so a trailing line is never dropped while the
//! worker is still writing it.

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::protocol::codec::LineCodec;
use crate::transport::TransportOptions;
use crate::Result;

/// Turns an async byte stream into a sequence of lines.
#[derive(Debug)]
pub struct LineReader<R> {
    framed: FramedRead<R, LineCodec>,
    stop: CancellationToken,
    options: TransportOptions,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Create a reader with default [`TransportOptions`].
    pub fn new(inner: R, stop: CancellationToken) -> Self {
        Self::with_options(inner, stop, TransportOptions::default())
    }

    /// Create a reader with explicit options.
    pub fn with_options(inner: R, stop: CancellationToken, options: TransportOptions) -> Self {
        Self {
            framed: FramedRead::new(inner, LineCodec::with_max_length(options.max_line_bytes)),
            stop,
            options,
        }
    }

    /// Whether bytes of an incomplete line are buffered.
    #[must_use]
    pub fn has_partial_line(&self) -> bool {
        !self.framed.read_buffer().is_empty()
    }

    /// Next line without its terminator.
    ///
    /// Returns `Ok(None)` once the stream is closed, or once the stop signal
    /// is set and nothing is buffered. A trailing unterminated line is
    /// returned before end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`](crate::AppError::Protocol) for an
    /// overlong line and [`AppError::Io`](crate::AppError::Io) for read
    /// failures. Both end the stream.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            match tokio::time::timeout(self.options.poll_interval, self.framed.next()).await {
                Ok(Some(Ok(line))) => return Ok(Some(line)),
                Ok(Some(Err(err))) => return Err(err),
                Ok(None) => {
                    debug!("line reader: end of stream");
                    return Ok(None);
                }
                Err(_elapsed) => {}
            }

            if self.stop.is_cancelled() && !self.has_partial_line() {
                debug!("line reader: stop signal observed, no partial line buffered");
                return Ok(None);
            }
        }
    }
}
