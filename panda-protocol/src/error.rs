use std::io;

use thiserror::Error;

/// Errors that may occur when framing, classifying or decoding protocol text.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The peer closed the stream while a response was still expected.
    #[error("remote end closed the connection")]
    RemoteClosed,

    /// A reply line matched none of the known response shapes.
    #[error("malformed response line {0:?}")]
    MalformedResponse(String),

    /// A stored command line matched none of the known command shapes.
    #[error("unrecognized command line {0:?}")]
    MalformedCommand(String),

    /// A table assignment block was not terminated by a blank line.
    #[error("unterminated table block for {0:?}")]
    UnterminatedTable(String),

    /// An assignment operator other than `<`, `<<`, `<B` or `<<B`.
    #[error("unknown table operator {0:?}")]
    UnknownOperator(String),

    /// An identification string that does not follow the
    /// `PandA SW: … FPGA: … rootfs: …` format.
    #[error("malformed identification string {idn:?}: {reason}")]
    MalformedIdn { idn: String, reason: &'static str },
}
