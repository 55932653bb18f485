//! # PandABox Client
//!
//! A synchronous Rust client for the PandABox control port, the
//! newline-delimited text protocol served by the
//! [PandABlocks control server](https://github.com/PandABlocks/PandABlocks-server)
//! on TCP port 8888.
//!
//! ## Overview
//!
//! This crate provides a high-level session over one persistent TCP
//! connection. It handles command encoding, reply framing and
//! classification, and provides design capture/restore: the controller's
//! entire mutable configuration can be saved as a replayable text script
//! and applied again later, with a firmware compatibility check guarding
//! the replay.
//!
//! ## Basic Usage
//!
//! ### Connecting and Querying
//!
//! ```ignore
//! use panda_client::{PandA, QueryResponse};
//!
//! let mut panda = PandA::new("panda.lab.example");
//! panda.connect()?;
//!
//! match panda.query("*IDN")? {
//!     QueryResponse::Single(idn) => println!("connected to {idn}"),
//!     QueryResponse::Multi(_) => unreachable!("*IDN answers with one value"),
//! }
//! ```
//!
//! ### Assignments
//!
//! ```ignore
//! use panda_protocol::TableOp;
//!
//! panda.assign("TTLIN1.TERM", "50-Ohm")?;
//! panda.assign_table("PGEN1.TABLE", TableOp::Overwrite, [1, 2, 3])?;
//! ```
//!
//! ### Designs
//!
//! ```ignore
//! let design = panda.save_design("panda.design")?;
//! // ... later, possibly against another device of the same FPGA build:
//! panda.load_design("panda.design", false)?;
//! ```
//!
//! ## Concurrency
//!
//! A session is strictly synchronous: one request is outstanding at a
//! time and every operation blocks until its reply is classified. Sharing
//! a session between threads requires external serialization.

use std::io::{self, ErrorKind, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use panda_protocol::framing::LineReader;
use panda_protocol::seq::{self, SeqPhase, SeqTrigger};
use panda_protocol::{Command, Response, TableOp};

pub mod design;
pub mod error;

pub use design::Design;
pub use error::{Error, Result};
pub use panda_protocol::idn::{FirmwareVersion, FirmwareWarning};

/// The control server's TCP port.
pub const DEFAULT_PORT: u16 = 8888;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The reply to a successful query: either one value or an ordered run of
/// values. Bare `OK` answers to queries are protocol violations and never
/// reach the caller.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum QueryResponse {
    Single(String),
    Multi(Vec<String>),
}

/// A session with one PandABox controller.
///
/// Owns the TCP connection and its receive buffer for the lifetime of the
/// session. All operations block the calling thread until a full reply is
/// classified; transport failures leave the session disconnected.
pub struct PandA {
    host: String,
    port: u16,
    timeout: Duration,
    conn: Option<LineReader<TcpStream>>,
}

impl PandA {
    /// Creates a disconnected session for the given host, using the
    /// default port and timeout.
    pub fn new(host: impl Into<String>) -> PandA {
        PandA {
            host: host.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            conn: None,
        }
    }

    /// Overrides the control port.
    pub fn port(mut self, port: u16) -> PandA {
        self.port = port;
        self
    }

    /// Overrides the session-wide connect/send/receive timeout. Fixed at
    /// connect time; there is no per-call override.
    pub fn timeout(mut self, timeout: Duration) -> PandA {
        self.timeout = timeout;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Opens the connection. A no-op when already connected.
    ///
    /// Disables output coalescing (`TCP_NODELAY`) and applies the session
    /// timeout to the connect itself and to all subsequent reads and
    /// writes. Never retries.
    pub fn connect(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let addr = format!("{}:{}", self.host, self.port);
        let connect_err = |source: io::Error| Error::Connect {
            addr: addr.clone(),
            source,
        };

        let resolved = addr.to_socket_addrs().map_err(connect_err)?;
        let mut last_err = None;
        for sockaddr in resolved {
            match TcpStream::connect_timeout(&sockaddr, self.timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true).map_err(connect_err)?;
                    stream
                        .set_read_timeout(Some(self.timeout))
                        .map_err(connect_err)?;
                    stream
                        .set_write_timeout(Some(self.timeout))
                        .map_err(connect_err)?;
                    log::debug!("connected to {sockaddr}");
                    self.conn = Some(LineReader::new(stream));
                    return Ok(());
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(connect_err(last_err.unwrap_or_else(|| {
            io::Error::new(ErrorKind::AddrNotAvailable, "host resolved to no addresses")
        })))
    }

    /// Closes the connection: half-closes the write side, then drops the
    /// stream. Safe to call at any time, including when already
    /// disconnected, and never fails.
    pub fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            let stream = conn.into_inner();
            let _ = stream.shutdown(Shutdown::Write);
            log::debug!("disconnected from {}:{}", self.host, self.port);
        }
    }

    /// Sends one command and classifies its reply.
    ///
    /// On a timeout or remote close the stream's framing position can no
    /// longer be trusted, so the session disconnects before surfacing the
    /// error.
    fn exchange(&mut self, command: &Command) -> Result<Response> {
        let conn = self.conn.as_mut().ok_or(Error::NotConnected)?;

        let mut wire = Vec::new();
        command.write_to(&mut wire).map_err(Error::from_io)?;
        log::trace!("-> {}", String::from_utf8_lossy(&wire).trim_end());

        let result = conn
            .get_mut()
            .write_all(&wire)
            .map_err(Error::from_io)
            .and_then(|()| Response::read_from(conn).map_err(Error::from_protocol));
        match result {
            Ok(response) => {
                log::trace!("<- {response:?}");
                Ok(response)
            }
            Err(err) if err.is_fatal() => {
                self.disconnect();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Interrogates `target` (the `?` suffix is appended if missing).
    ///
    /// `ERR` replies surface as [`Error::Device`]; a bare `OK` reply to a
    /// query is a protocol violation, since queries must answer with a
    /// value.
    pub fn query(&mut self, target: &str) -> Result<QueryResponse> {
        match self.exchange(&Command::query(target))? {
            Response::Value(value) => Ok(QueryResponse::Single(value)),
            Response::MultiValue(values) => Ok(QueryResponse::Multi(values)),
            Response::Error(message) => Err(Error::Device(message)),
            Response::Success => Err(Error::Protocol(format!(
                "query {target:?} answered with bare OK"
            ))),
        }
    }

    /// Queries a target that must answer with exactly one value.
    pub fn query_single(&mut self, target: &str) -> Result<String> {
        match self.query(target)? {
            QueryResponse::Single(value) => Ok(value),
            QueryResponse::Multi(_) => Err(Error::Protocol(format!(
                "query {target:?} answered with multiple values"
            ))),
        }
    }

    /// Queries a target that must answer with a (possibly empty) run of
    /// values.
    pub fn query_multi(&mut self, target: &str) -> Result<Vec<String>> {
        match self.query(target)? {
            QueryResponse::Multi(values) => Ok(values),
            QueryResponse::Single(_) => Err(Error::Protocol(format!(
                "query {target:?} answered with a single value"
            ))),
        }
    }

    /// Queries a target and parses its single value as a number.
    pub fn query_value(&mut self, target: &str) -> Result<f64> {
        let value = self.query_single(target)?;
        value.trim().parse().map_err(|_| {
            Error::Protocol(format!("query {target:?} answered non-numeric {value:?}"))
        })
    }

    /// Assigns a scalar value to `target` with the `=` operator.
    ///
    /// Only a bare `OK` is a valid outcome; value replies to assignments
    /// are protocol violations.
    pub fn assign(&mut self, target: &str, value: &str) -> Result<()> {
        self.expect_success(&Command::assign(target, value))
    }

    /// Writes a table field, overwriting or appending per `op`.
    ///
    /// An empty value sequence is valid and produces only the header line
    /// and the blank terminator on the wire.
    pub fn assign_table<V: ToString>(
        &mut self,
        target: &str,
        op: TableOp,
        values: impl IntoIterator<Item = V>,
    ) -> Result<()> {
        self.expect_success(&Command::assign_table(target, op, values))
    }

    fn expect_success(&mut self, command: &Command) -> Result<()> {
        match self.exchange(command)? {
            Response::Success => Ok(()),
            Response::Error(message) => Err(Error::Device(message)),
            Response::Value(_) | Response::MultiValue(_) => Err(Error::Protocol(
                "assignment answered with a value".to_string(),
            )),
        }
    }

    /// Overwrites the table of sequencer block `SEQ<block>` with one row
    /// per position, all sharing the given repeat count, trigger and
    /// phase masks.
    #[allow(clippy::too_many_arguments)]
    pub fn send_seq_table(
        &mut self,
        block: u32,
        repeats: u16,
        trigger: SeqTrigger,
        positions: &[i32],
        time1: u32,
        phase1: SeqPhase,
        time2: u32,
        phase2: SeqPhase,
    ) -> Result<()> {
        let rows = seq::table_rows(repeats, trigger, positions, time1, phase1, time2, phase2);
        self.assign_table(&format!("SEQ{block}.TABLE"), TableOp::Overwrite, rows)
    }

    /// The number of channels currently enabled for capture.
    pub fn capture_channel_count(&mut self) -> Result<usize> {
        Ok(self.query_multi("*CAPTURE")?.len())
    }
}

impl Drop for PandA {
    fn drop(&mut self) {
        self.disconnect();
    }
}
