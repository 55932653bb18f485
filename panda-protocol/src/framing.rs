//! Line framing over an arbitrarily fragmented byte stream.

use std::io::{ErrorKind, Read};

use crate::error::ProtocolError;

/// The line delimiter used by the control protocol.
pub const DELIMITER: u8 = b'\n';

const READ_CHUNK: usize = 4096;

/// Pull-based line reader holding its own partial-buffer state.
///
/// The control server speaks newline-delimited ASCII, but TCP delivers the
/// reply stream in arbitrary fragments: a single `recv` may carry half a
/// line, several lines, or the tail of one response followed by the head of
/// the next. [`LineReader::read_line`] accumulates transport chunks until at
/// least one complete line is buffered, yields it with the delimiter
/// stripped, and keeps any trailing bytes for the next call.
///
/// ```
/// use std::io::Cursor;
/// use panda_protocol::framing::LineReader;
///
/// let mut reader = LineReader::new(Cursor::new(b"OK\n!A\n".to_vec()));
/// assert_eq!(reader.read_line().unwrap(), "OK");
/// assert_eq!(reader.read_line().unwrap(), "!A");
/// ```
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R> LineReader<R> {
    pub fn new(inner: R) -> LineReader<R> {
        LineReader {
            inner,
            buf: Vec::new(),
        }
    }

    /// Gets a reference to the underlying transport.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Gets a mutable reference to the underlying transport.
    ///
    /// Writing through this reference is fine; reading directly would
    /// bypass the line buffer.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consumes the reader, returning the underlying transport and
    /// discarding any buffered bytes.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Bytes received from the transport but not yet yielded as lines.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

impl<R: Read> LineReader<R> {
    /// Block until a complete line is available and return it without the
    /// trailing delimiter.
    ///
    /// A zero-byte read from the transport means the remote end closed the
    /// stream and surfaces as [`ProtocolError::RemoteClosed`].
    pub fn read_line(&mut self) -> Result<String, ProtocolError> {
        loop {
            if let Some(at) = self.buf.iter().position(|&b| b == DELIMITER) {
                let rest = self.buf.split_off(at + 1);
                let mut line = std::mem::replace(&mut self.buf, rest);
                line.pop();
                return match String::from_utf8(line) {
                    Ok(line) => Ok(line),
                    Err(err) => Err(ProtocolError::MalformedResponse(
                        String::from_utf8_lossy(err.as_bytes()).into_owned(),
                    )),
                };
            }

            let mut chunk = [0u8; READ_CHUNK];
            let read = match self.inner.read(&mut chunk) {
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            if read == 0 {
                return Err(ProtocolError::RemoteClosed);
            }
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }
}
