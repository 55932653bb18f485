use std::io::{self, ErrorKind};

use panda_protocol::error::ProtocolError;
use thiserror::Error;

/// Errors surfaced by a controller session.
///
/// Transport failures are never retried internally: after a timeout or a
/// remote close the session is left disconnected and the caller decides
/// whether to reconnect.
#[derive(Debug, Error)]
pub enum Error {
    /// The controller could not be reached.
    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// An operation was attempted on a disconnected session.
    #[error("not connected")]
    NotConnected,

    /// A send or receive deadline was exceeded. The framing position of
    /// the stream can no longer be trusted, so the session has been
    /// disconnected.
    #[error("operation timed out")]
    Timeout,

    /// The controller closed the stream. The session has been
    /// disconnected.
    #[error("connection closed by controller")]
    RemoteClosed,

    /// Any other transport or file failure.
    #[error(transparent)]
    Io(io::Error),

    /// A reply could not be classified, or its kind does not match the
    /// command that was issued.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The controller answered with an explicit error response; carries
    /// the controller's message verbatim.
    #[error("{0}")]
    Device(String),

    /// The design's recorded FPGA firmware differs from the installed one.
    #[error("design was captured against FPGA {design}, installed is {installed}")]
    FirmwareMismatch { design: String, installed: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn from_io(err: io::Error) -> Error {
        match err.kind() {
            // Read timeouts surface as WouldBlock on Unix sockets.
            ErrorKind::WouldBlock | ErrorKind::TimedOut => Error::Timeout,
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe => Error::RemoteClosed,
            _ => Error::Io(err),
        }
    }

    pub(crate) fn from_protocol(err: ProtocolError) -> Error {
        match err {
            ProtocolError::Io(err) => Error::from_io(err),
            ProtocolError::RemoteClosed => Error::RemoteClosed,
            other => Error::Protocol(other.to_string()),
        }
    }

    /// True when the transport can no longer be trusted and the session
    /// must drop it.
    pub(crate) fn is_fatal(&self) -> bool {
        matches!(self, Error::Timeout | Error::RemoteClosed | Error::Io(_))
    }
}
