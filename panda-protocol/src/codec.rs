/// Read and write implementations for commands and responses
use std::io::{self, Read, Write};

use crate::{
    error::ProtocolError,
    framing::LineReader,
    protocol::{Command, Response, TableOp},
};

const RESPONSE_SUCCESS: &str = "OK";
const RESPONSE_VALUE_PREFIX: &str = "OK =";
const RESPONSE_ERROR_PREFIX: &str = "ERR ";
const MULTI_VALUE_PREFIX: char = '!';
const MULTI_VALUE_END: &str = ".";
const QUERY_SUFFIX: char = '?';
const TABLE_OP_START: char = '<';

impl Command {
    /// Writes the command in its wire form, including all delimiters.
    ///
    /// Table assignments produce the header line, one row per value and a
    /// blank terminating line; an empty value sequence is valid and produces
    /// only header and terminator.
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        match self {
            Command::Query { target } => {
                if target.ends_with(QUERY_SUFFIX) {
                    writeln!(writer, "{target}")
                } else {
                    writeln!(writer, "{target}{QUERY_SUFFIX}")
                }
            }
            Command::Assign { target, value } => writeln!(writer, "{target}={value}"),
            Command::AssignTable { target, op, values } => {
                writeln!(writer, "{target}{op}")?;
                for value in values {
                    writeln!(writer, "{value}")?;
                }
                writeln!(writer)
            }
        }
    }
}

impl Response {
    /// Reads and classifies one full response from the line reader.
    ///
    /// A response is not complete merely because one line was read: a line
    /// starting the multi-value marker keeps the reader pulling further
    /// lines until the `.` terminator arrives. Any line outside the four
    /// known shapes is a malformed-response error, never coerced.
    pub fn read_from<R: Read>(reader: &mut LineReader<R>) -> Result<Response, ProtocolError> {
        let line = reader.read_line()?;
        if line == RESPONSE_SUCCESS {
            return Ok(Response::Success);
        }
        if let Some(value) = line.strip_prefix(RESPONSE_VALUE_PREFIX) {
            return Ok(Response::Value(value.to_string()));
        }
        if let Some(message) = line.strip_prefix(RESPONSE_ERROR_PREFIX) {
            return Ok(Response::Error(message.to_string()));
        }
        if line == MULTI_VALUE_END {
            return Ok(Response::MultiValue(Vec::new()));
        }
        if let Some(first) = line.strip_prefix(MULTI_VALUE_PREFIX) {
            let mut values = vec![first.to_string()];
            loop {
                let line = reader.read_line()?;
                if line == MULTI_VALUE_END {
                    return Ok(Response::MultiValue(values));
                }
                match line.strip_prefix(MULTI_VALUE_PREFIX) {
                    Some(value) => values.push(value.to_string()),
                    None => return Err(ProtocolError::MalformedResponse(line)),
                }
            }
        }
        Err(ProtocolError::MalformedResponse(line))
    }
}

/// Streaming decoder for stored design scripts.
///
/// Turns the literal command lines produced by design capture back into
/// [`Command`] values. Table assignments consume their row lines up to and
/// including the blank terminator; every other line must be a query or a
/// scalar assignment.
pub struct ScriptParser<I> {
    lines: I,
}

impl<'a, I> ScriptParser<I>
where
    I: Iterator<Item = &'a str>,
{
    pub fn new(lines: I) -> ScriptParser<I> {
        ScriptParser { lines }
    }

    fn decode(&mut self, line: &str) -> Result<Command, ProtocolError> {
        if line.ends_with(QUERY_SUFFIX) {
            return Ok(Command::Query {
                target: line.to_string(),
            });
        }
        if let Some(at) = line.find(TABLE_OP_START) {
            let target = line[..at].to_string();
            let op: TableOp = line[at..].parse()?;
            let mut values = Vec::new();
            loop {
                match self.lines.next() {
                    None => return Err(ProtocolError::UnterminatedTable(target)),
                    Some("") => break,
                    Some(row) => values.push(row.to_string()),
                }
            }
            return Ok(Command::AssignTable { target, op, values });
        }
        if let Some(at) = line.find('=') {
            return Ok(Command::Assign {
                target: line[..at].to_string(),
                value: line[at + 1..].to_string(),
            });
        }
        Err(ProtocolError::MalformedCommand(line.to_string()))
    }
}

impl<'a, I> Iterator for ScriptParser<I>
where
    I: Iterator<Item = &'a str>,
{
    type Item = Result<Command, ProtocolError>;

    fn next(&mut self) -> Option<Result<Command, ProtocolError>> {
        let line = self.lines.next()?;
        Some(self.decode(line))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn classify(reply: &[u8]) -> Result<Response, ProtocolError> {
        let mut reader = LineReader::new(Cursor::new(reply.to_vec()));
        Response::read_from(&mut reader)
    }

    #[test]
    fn write_query() {
        let mut out = Vec::new();
        Command::query("TTLIN1.TERM").write_to(&mut out).unwrap();
        assert_eq!(out, b"TTLIN1.TERM?\n".to_vec());
    }

    #[test]
    fn write_query_keeps_existing_suffix() {
        let mut out = Vec::new();
        Command::query("*IDN?").write_to(&mut out).unwrap();
        assert_eq!(out, b"*IDN?\n".to_vec());
    }

    #[test]
    fn write_assign() {
        let mut out = Vec::new();
        Command::assign("TTLIN1.TERM", "50-Ohm")
            .write_to(&mut out)
            .unwrap();
        assert_eq!(out, b"TTLIN1.TERM=50-Ohm\n".to_vec());
    }

    #[test]
    fn write_table_assign() {
        let mut out = Vec::new();
        Command::assign_table("PGEN1.TABLE", TableOp::Overwrite, [1, 2, 3])
            .write_to(&mut out)
            .unwrap();
        assert_eq!(out, b"PGEN1.TABLE<\n1\n2\n3\n\n".to_vec());
    }

    #[test]
    fn write_empty_table_assign() {
        let mut out = Vec::new();
        Command::assign_table("PGEN1.TABLE", TableOp::Append, Vec::<String>::new())
            .write_to(&mut out)
            .unwrap();
        assert_eq!(out, b"PGEN1.TABLE<<\n\n".to_vec());
    }

    #[test]
    fn unknown_operator_rejected() {
        match "+".parse::<TableOp>() {
            Err(ProtocolError::UnknownOperator(op)) => assert_eq!(op, "+"),
            other => panic!("expected UnknownOperator, got {:?}", other),
        }
    }

    #[test]
    fn classify_success() {
        assert_eq!(classify(b"OK\n").unwrap(), Response::Success);
    }

    #[test]
    fn classify_value() {
        assert_eq!(
            classify(b"OK =5\n").unwrap(),
            Response::Value("5".to_string())
        );
    }

    #[test]
    fn classify_error() {
        assert_eq!(
            classify(b"ERR No such block\n").unwrap(),
            Response::Error("No such block".to_string())
        );
    }

    #[test]
    fn classify_multi_value() {
        assert_eq!(
            classify(b"!A\n!B\n.\n").unwrap(),
            Response::MultiValue(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn classify_empty_multi_value() {
        assert_eq!(classify(b".\n").unwrap(), Response::MultiValue(Vec::new()));
    }

    #[test]
    fn classify_malformed_first_line() {
        match classify(b"WAT\n") {
            Err(ProtocolError::MalformedResponse(line)) => assert_eq!(line, "WAT"),
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
    }

    #[test]
    fn classify_malformed_continuation_line() {
        match classify(b"!A\nWAT\n.\n") {
            Err(ProtocolError::MalformedResponse(line)) => assert_eq!(line, "WAT"),
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
    }

    #[test]
    fn parse_script_commands() {
        let script = "*ECHO PandA SW: 2.0.2 FPGA: 0.0.0 00000000 00000000 rootfs: Test Server?\n\
                      QDEC1.B=ZERO\n\
                      PGEN1.TABLE<B\n\
                      AQAAAAIAAAADAAAA\n\
                      \n\
                      *METADATA.LABEL_BLAH1=\n";
        let commands: Vec<Command> = ScriptParser::new(script.lines())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            commands,
            vec![
                Command::query(
                    "*ECHO PandA SW: 2.0.2 FPGA: 0.0.0 00000000 00000000 rootfs: Test Server?"
                ),
                Command::assign("QDEC1.B", "ZERO"),
                Command::assign_table(
                    "PGEN1.TABLE",
                    TableOp::OverwriteBase64,
                    ["AQAAAAIAAAADAAAA"]
                ),
                Command::assign("*METADATA.LABEL_BLAH1", ""),
            ]
        );
    }

    #[test]
    fn parse_script_empty_table_block() {
        let commands: Vec<Command> = ScriptParser::new("*METADATA.YAML<\n\n".lines())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            commands,
            vec![Command::assign_table(
                "*METADATA.YAML",
                TableOp::Overwrite,
                Vec::<String>::new()
            )]
        );
    }

    #[test]
    fn parse_script_unterminated_table() {
        let mut parser = ScriptParser::new("PGEN1.TABLE<\n1\n2".lines());
        match parser.next() {
            Some(Err(ProtocolError::UnterminatedTable(target))) => {
                assert_eq!(target, "PGEN1.TABLE")
            }
            other => panic!("expected UnterminatedTable, got {:?}", other),
        }
    }

    #[test]
    fn parse_script_rejects_unknown_shape() {
        let mut parser = ScriptParser::new("no shape at all".lines());
        match parser.next() {
            Some(Err(ProtocolError::MalformedCommand(line))) => {
                assert_eq!(line, "no shape at all")
            }
            other => panic!("expected MalformedCommand, got {:?}", other),
        }
    }
}
