//! Line codec for worker streams.
//!
//! Wraps [`tokio_util::codec::AnyDelimiterCodec`] configured to split on `\n`
//! only, so a preceding `\r` is kept as part of the line. Frames are decoded
//! as UTF-8, replacing invalid sequences, so a misbehaving worker cannot wedge
//! the reader with a single bad byte.
//!
//! Use [`LineCodec`] with [`tokio_util::codec::FramedRead`]. The encoder side
//! is used by [`LineWriter`](crate::transport::LineWriter).

use bytes::BytesMut;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, Encoder};

use crate::{AppError, Result};

/// Default maximum line length: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// `\n`-delimited line codec with a maximum line length.
#[derive(Debug, Clone)]
pub struct LineCodec(AnyDelimiterCodec);

impl LineCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Create a codec accepting lines of at most `max_length` bytes.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self(AnyDelimiterCodec::new_with_max_length(
            b"\n".to_vec(),
            b"\n".to_vec(),
            max_length,
        ))
    }

    /// Configured maximum line length.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.0.max_length()
    }

    fn map_error(&self, err: AnyDelimiterCodecError) -> AppError {
        match err {
            AnyDelimiterCodecError::MaxChunkLengthExceeded => AppError::Protocol(format!(
                "line too long: exceeded {} bytes",
                self.max_length()
            )),
            AnyDelimiterCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next complete line from `src`.
    ///
    /// Returns `Ok(None)` while only a partial line is buffered.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        match self.0.decode(src) {
            Ok(frame) => Ok(frame.as_deref().map(lossy)),
            Err(err) => Err(self.map_error(err)),
        }
    }

    /// Decode the final, possibly unterminated, line at end of stream.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        match self.0.decode_eof(src) {
            Ok(frame) => Ok(frame.as_deref().map(lossy)),
            Err(err) => Err(self.map_error(err)),
        }
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = AppError;

    /// Encode `item` followed by exactly one `\n`.
    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<()> {
        self.0.encode(item, dst).map_err(|err| self.map_error(err))
    }
}

fn lossy(frame: &[u8]) -> String {
    String::from_utf8_lossy(frame).into_owned()
}
