//! Capture and restore of complete controller designs.
//!
//! A design is the controller's entire mutable configuration serialized
//! as a replayable command script: one identification header followed by
//! the literal assignment and table-assignment commands that reproduce
//! the state. The header is stored as a harmless `*ECHO …?` query so that
//! replaying it can never be mistaken for an assignment.

use std::fs;
use std::path::{Path, PathBuf};

use panda_protocol::codec::ScriptParser;
use panda_protocol::idn::{FirmwareVersion, FirmwareWarning};
use panda_protocol::{Command, error::ProtocolError};

use crate::{Error, PandA, Result};

const HEADER_PREFIX: &str = "*ECHO ";
const HEADER_SUFFIX: char = '?';

/// A captured controller configuration.
///
/// Immutable once captured; consumed top-to-bottom on restore. A design
/// holds no reference to the session it was captured from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Design {
    text: String,
}

impl Design {
    /// Wraps an existing script, e.g. one read from a version-controlled
    /// file. The first line must be an `*ECHO <identification>?` header.
    pub fn from_text(text: impl Into<String>) -> Result<Design> {
        let design = Design { text: text.into() };
        design.header_idn()?;
        Ok(design)
    }

    /// Reads a design script from a file.
    pub fn read(path: impl AsRef<Path>) -> Result<Design> {
        Design::from_text(fs::read_to_string(path).map_err(Error::Io)?)
    }

    /// Writes the script via a temporary file followed by a rename, so an
    /// interrupted write never leaves a partial design on disk.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let result = fs::write(&tmp, &self.text).and_then(|()| fs::rename(&tmp, path));
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result.map_err(Error::Io)
    }

    /// The full script text, byte-for-byte as captured.
    pub fn as_text(&self) -> &str {
        &self.text
    }

    /// The firmware identification recorded at capture time.
    pub fn firmware(&self) -> Result<FirmwareVersion> {
        self.header_idn()?.parse().map_err(Error::from_protocol)
    }

    fn header_idn(&self) -> Result<&str> {
        let header = self.text.lines().next().unwrap_or("");
        header
            .strip_prefix(HEADER_PREFIX)
            .and_then(|rest| rest.strip_suffix(HEADER_SUFFIX))
            .ok_or_else(|| {
                Error::from_protocol(ProtocolError::MalformedCommand(header.to_string()))
            })
    }

    /// The replayable commands after the identification header.
    fn commands(&self) -> impl Iterator<Item = std::result::Result<Command, ProtocolError>> + '_ {
        ScriptParser::new(self.text.lines().skip(1))
    }
}

impl PandA {
    /// Captures the controller's full configuration.
    ///
    /// The change-tracking queries (`*CHANGES.…?`) report state changed
    /// since the last such query on the same connection, so the session is
    /// re-opened first: on a fresh connection they report the entire
    /// current state. The snapshot is best-effort-consistent; the
    /// controller offers no way to freeze state across the individual
    /// queries.
    pub fn capture_design(&mut self) -> Result<Design> {
        self.connect()?;
        let idn = self.query_single("*IDN")?;

        // Reset the change cursor so the queries below see full state.
        self.disconnect();
        self.connect()?;

        let mut text = String::new();
        text.push_str(HEADER_PREFIX);
        text.push_str(&idn);
        text.push(HEADER_SUFFIX);
        text.push('\n');

        for line in self.query_multi("*CHANGES.ATTR")? {
            text.push_str(&line);
            text.push('\n');
        }
        for line in self.query_multi("*CHANGES.CONFIG")? {
            text.push_str(&line);
            text.push('\n');
        }

        // Table data is transferred base64 encoded; the change list must be
        // read completely before fetching the individual tables.
        for table in self.query_multi("*CHANGES.TABLE")? {
            let field = table.strip_suffix('<').ok_or_else(|| {
                Error::Protocol(format!("unexpected table change entry {table:?}"))
            })?;
            text.push_str(&table);
            text.push_str("B\n");
            for row in self.query_multi(&format!("{field}.B"))? {
                text.push_str(&row);
                text.push('\n');
            }
            text.push('\n');
        }

        // Metadata mixes scalar and table entries; metadata tables are
        // transferred as ASCII, unlike the base64 blocks above.
        for entry in self.query_multi("*CHANGES.METADATA")? {
            if let Some(field) = entry.strip_suffix('<') {
                text.push_str(&entry);
                text.push('\n');
                for row in self.query_multi(field)? {
                    text.push_str(&row);
                    text.push('\n');
                }
                text.push('\n');
            } else if entry.contains('=') {
                text.push_str(&entry);
                text.push('\n');
            } else {
                return Err(Error::Protocol(format!(
                    "unexpected metadata change entry {entry:?}"
                )));
            }
        }

        Ok(Design { text })
    }

    /// Captures a design and writes it to `path`.
    ///
    /// The script is buffered in memory and written only once capture has
    /// fully succeeded; a failure partway through leaves no partial file.
    pub fn save_design(&mut self, path: impl AsRef<Path>) -> Result<Design> {
        let design = self.capture_design()?;
        design.write(path)?;
        Ok(design)
    }

    /// Reads a design from `path` and restores it, see
    /// [`restore_design`](PandA::restore_design).
    pub fn load_design(&mut self, path: impl AsRef<Path>, force: bool) -> Result<Vec<FirmwareWarning>> {
        let design = Design::read(path)?;
        self.restore_design(&design, force)
    }

    /// Replays a design against the live controller.
    ///
    /// Unless `force` is set, the recorded identification is first checked
    /// against the installed firmware: FPGA divergence aborts with
    /// [`Error::FirmwareMismatch`] before any command is sent, while
    /// software or rootfs divergence is logged and returned as warnings.
    ///
    /// Commands are applied strictly in script order, stopping at the
    /// first error. The controller has no rollback primitive, so a failed
    /// restore leaves the device in whatever partial state was reached.
    pub fn restore_design(&mut self, design: &Design, force: bool) -> Result<Vec<FirmwareWarning>> {
        let mut warnings = Vec::new();
        if force {
            log::warn!("firmware compatibility check skipped");
        } else {
            let recorded = design.firmware()?;
            let installed: FirmwareVersion = self
                .query_single("*IDN")?
                .parse()
                .map_err(Error::from_protocol)?;
            if !recorded.fpga_compatible(&installed) {
                return Err(Error::FirmwareMismatch {
                    design: recorded.fpga_summary(),
                    installed: installed.fpga_summary(),
                });
            }
            warnings = recorded.soft_mismatches(&installed);
            for warning in &warnings {
                log::warn!("{warning}");
            }
        }

        for command in design.commands() {
            match command.map_err(Error::from_protocol)? {
                Command::Query { target } => {
                    self.query(&target)?;
                }
                Command::Assign { target, value } => self.assign(&target, &value)?,
                Command::AssignTable { target, op, values } => {
                    self.assign_table(&target, op, values)?
                }
            }
        }
        Ok(warnings)
    }
}
