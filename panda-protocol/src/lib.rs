//! # PandABox Control Protocol Library
//!
//! This crate implements the text protocol spoken by the
//! [PandABlocks control server](https://github.com/PandABlocks/PandABlocks-server)
//! on its configuration port, allowing you to:
//!
//! - Encode field queries, scalar assignments and table assignments in
//!   their wire form
//! - Frame and classify the controller's newline-delimited replies
//! - Parse stored design scripts back into commands for replay
//! - Parse and compare firmware identification strings
//! - Pack sequencer (`SEQ`) block table rows
//!
//! ## Wire Format
//!
//! All traffic is newline-delimited ASCII. Commands:
//!
//! - **Query**: `TARGET?`
//! - **Scalar assignment**: `TARGET=VALUE`
//! - **Table assignment**: `TARGET<OP`, one value per line, blank line
//!   terminator (`OP` is empty, `<`, `B` or `<B` after the first `<`)
//!
//! Replies:
//!
//! - **Success**: `OK`
//! - **Single value**: `OK =VALUE`
//! - **Multi value**: a run of `!VALUE` lines terminated by `.`
//! - **Error**: `ERR MESSAGE`
//!
//! ## Basic Usage
//!
//! ### Encoding Commands
//!
//! ```
//! use panda_protocol::{Command, TableOp};
//!
//! let mut wire = Vec::new();
//! Command::query("TTLIN1.TERM")
//!     .write_to(&mut wire)
//!     .expect("Writing to vector shouldn't fail");
//! assert_eq!(wire, b"TTLIN1.TERM?\n");
//!
//! let mut wire = Vec::new();
//! Command::assign_table("SEQ1.TABLE", TableOp::Overwrite, [1, 2])
//!     .write_to(&mut wire)
//!     .expect("Writing to vector shouldn't fail");
//! assert_eq!(wire, b"SEQ1.TABLE<\n1\n2\n\n");
//! ```
//!
//! ### Classifying Replies
//!
//! ```
//! use std::io::Cursor;
//! use panda_protocol::{Response, framing::LineReader};
//!
//! let mut reader = LineReader::new(Cursor::new(b"!A\n!B\n.\n".to_vec()));
//! let response = Response::read_from(&mut reader).expect("Reply should classify");
//! assert_eq!(
//!     response,
//!     Response::MultiValue(vec!["A".to_string(), "B".to_string()])
//! );
//! ```
//!
//! ### Firmware Identification
//!
//! ```
//! use panda_protocol::idn::FirmwareVersion;
//!
//! let idn = "PandA SW: 2.0.2 FPGA: 0.0.0 00000000 00000000 rootfs: Test Server";
//! let version: FirmwareVersion = idn.parse().expect("Identification should parse");
//! assert_eq!(version.server.major, 2);
//! assert!(version.fpga_compatible(&version));
//! ```
//!
//! ## Error Handling
//!
//! This library uses the [`error::ProtocolError`] type for framing and
//! decoding errors. Lines that match no known response or command shape
//! are always errors, never silently coerced.
//!
//! ## Concurrency
//!
//! The protocol is strictly synchronous: exactly one request may be
//! outstanding per connection, and replies arrive in order. The types in
//! this crate do no locking of their own; a [`framing::LineReader`]
//! requires external serialization when shared.

pub mod protocol;
pub use protocol::*;
pub mod codec;
pub mod error;
pub mod framing;
pub mod idn;
pub mod seq;
