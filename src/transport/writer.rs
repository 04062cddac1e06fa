//! Line writer.
//!
//! Appends exactly one `\n` per line and flushes after every send, so the
//! worker never waits on a reply stuck in a buffer.

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::{debug, error};

use crate::protocol::codec::LineCodec;
use crate::{AppError, Result};

/// Line sink over an async byte stream.
#[derive(Debug)]
pub struct LineWriter<W> {
    inner: W,
    codec: LineCodec,
    buf: BytesMut,
}

impl<W> LineWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            codec: LineCodec::new(),
            buf: BytesMut::new(),
        }
    }

    /// Write `line` plus terminator and flush.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`]`("write failed: …")` if the stream is closed.
    pub async fn send(&mut self, line: &str) -> Result<()> {
        self.send_all(std::iter::once(line)).await
    }

    /// Write every line, each with its terminator, then flush once.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`]`("write failed: …")` if the stream is closed.
    pub async fn send_all<I, S>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.buf.clear();
        for line in lines {
            debug!(line = line.as_ref(), "line writer: send");
            self.codec.encode(line, &mut self.buf)?;
        }
        self.inner
            .write_all(&self.buf)
            .await
            .map_err(|e| AppError::Io(format!("write failed: {e}")))?;
        self.inner
            .flush()
            .await
            .map_err(|e| AppError::Io(format!("flush failed: {e}")))
    }

    /// Close the stream. A `cause` is reported through the log rather than
    /// returned; shutdown failures are only logged.
    pub async fn close(mut self, cause: Option<&AppError>) {
        if let Some(cause) = cause {
            error!(%cause, "line writer: closing after error");
        }
        if let Err(err) = self.inner.shutdown().await {
            debug!(%err, "line writer: shutdown failed");
        }
    }
}
