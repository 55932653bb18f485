use std::fmt::Display;
use std::str::FromStr;

use crate::error::ProtocolError;

/// Table value assignment operators.
///
/// Tables can be overwritten or appended to, and row data can be
/// transferred as decimal ASCII or base64.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TableOp {
    /// `<` — overwrite the table with ASCII rows.
    Overwrite,
    /// `<<` — append ASCII rows to the table.
    Append,
    /// `<B` — overwrite the table with base64 encoded rows.
    OverwriteBase64,
    /// `<<B` — append base64 encoded rows to the table.
    AppendBase64,
}

impl TableOp {
    pub fn as_str(self) -> &'static str {
        match self {
            TableOp::Overwrite => "<",
            TableOp::Append => "<<",
            TableOp::OverwriteBase64 => "<B",
            TableOp::AppendBase64 => "<<B",
        }
    }
}

impl Display for TableOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableOp {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<TableOp, ProtocolError> {
        match s {
            "<" => Ok(TableOp::Overwrite),
            "<<" => Ok(TableOp::Append),
            "<B" => Ok(TableOp::OverwriteBase64),
            "<<B" => Ok(TableOp::AppendBase64),
            other => Err(ProtocolError::UnknownOperator(other.to_string())),
        }
    }
}

/// One outbound operation on the control port.
///
/// A command is built, sent and discarded; exactly one [`Response`] is read
/// per command before the next may be sent. Targets are dotted field or
/// attribute paths (e.g. `TTLIN1.TERM`) and are used verbatim on the wire;
/// their validity is owned by the controller.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Interrogate the current value of a field or attribute.
    Query { target: String },
    /// Assign a scalar value with the `=` operator.
    Assign { target: String, value: String },
    /// Replace or extend a table field.
    AssignTable {
        target: String,
        op: TableOp,
        values: Vec<String>,
    },
}

impl Command {
    pub fn query(target: impl Into<String>) -> Command {
        Command::Query {
            target: target.into(),
        }
    }

    pub fn assign(target: impl Into<String>, value: impl Into<String>) -> Command {
        Command::Assign {
            target: target.into(),
            value: value.into(),
        }
    }

    pub fn assign_table<V: ToString>(
        target: impl Into<String>,
        op: TableOp,
        values: impl IntoIterator<Item = V>,
    ) -> Command {
        Command::AssignTable {
            target: target.into(),
            op,
            values: values.into_iter().map(|value| value.to_string()).collect(),
        }
    }
}

/// The decoded reply to one [`Command`].
///
/// The controller guarantees in-order, non-interleaved replies because only
/// one request may be outstanding per connection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    /// `OK` — the command succeeded and carries no payload.
    Success,
    /// `OK =VALUE` — a single value reply.
    Value(String),
    /// A run of `!VALUE` lines terminated by `.` — zero or more values.
    MultiValue(Vec<String>),
    /// `ERR MESSAGE` — the controller rejected the command.
    Error(String),
}
