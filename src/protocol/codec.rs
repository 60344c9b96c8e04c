//! Bounded line framing for controller connections.
//!
//! Wraps [`AnyDelimiterCodec`] split on `\n` with a maximum chunk length.
//! Lines come out as raw bytes; UTF-8 validation happens in
//! [`decode`](super::frame::decode) so that one bad line gets an error reply
//! instead of ending the stream.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tokio_util::codec::FramedRead;
//! use major_tom::protocol::LineCodec;
//!
//! let lines = FramedRead::new(read_half, LineCodec::new(4096));
//! ```

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder};

use crate::{AppError, Result};

/// Newline-delimited framing with a hard per-line limit.
///
/// Lines longer than `max_length` bytes (terminator excluded) fail with
/// [`AppError::LineTooLong`]. A trailing `\r` is stripped. Outbound lines
/// are produced by [`encode`](super::frame::encode).
#[derive(Debug)]
pub struct LineCodec {
    inner: AnyDelimiterCodec,
    max_length: usize,
}

impl LineCodec {
    /// Create a codec that rejects lines longer than `max_length` bytes.
    #[must_use]
    pub fn new(max_length: usize) -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(
                b"\n".to_vec(),
                b"\n".to_vec(),
                max_length,
            ),
            max_length,
        }
    }

    fn map_error(&self, err: AnyDelimiterCodecError) -> AppError {
        match err {
            AnyDelimiterCodecError::MaxChunkLengthExceeded => {
                AppError::LineTooLong(format!("exceeded {} bytes", self.max_length))
            }
            AnyDelimiterCodecError::Io(err) => AppError::from(err),
        }
    }
}

impl Decoder for LineCodec {
    type Item = Bytes;
    type Error = AppError;

    /// Return the next complete line, or `Ok(None)` while still buffering.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        match self.inner.decode(src) {
            Ok(line) => Ok(line.map(strip_carriage_return)),
            Err(err) => Err(self.map_error(err)),
        }
    }

    /// Flush an unterminated final line when the peer closes.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        match self.inner.decode_eof(src) {
            Ok(line) => Ok(line.map(strip_carriage_return)),
            Err(err) => Err(self.map_error(err)),
        }
    }
}

fn strip_carriage_return(mut line: Bytes) -> Bytes {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line
}
