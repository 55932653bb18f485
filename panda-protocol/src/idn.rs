//! Parsing and comparison of controller identification strings.
//!
//! `*IDN?` answers with a single line of the form
//!
//! ```text
//! PandA SW: 2.0.2 FPGA: 0.0.0 00000000 00000000 rootfs: Test Server
//! ```
//!
//! naming the control-server software version, the installed FPGA app
//! version with its build and supporting-firmware ids, and a free-form
//! root-filesystem description. A stored design records this string so
//! that a restore can check the design was captured against compatible
//! firmware: the blocks a design references only exist in the FPGA app it
//! was captured from, so FPGA divergence is fatal while software or rootfs
//! divergence is merely worth reporting.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::ProtocolError;

const SW_PREFIX: &str = "PandA SW: ";
const FPGA_SEPARATOR: &str = " FPGA: ";
const ROOTFS_SEPARATOR: &str = " rootfs: ";

/// A dotted `major.minor.patch` version.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct VersionTriple {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Display for VersionTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionTriple {
    type Err = ();

    fn from_str(s: &str) -> Result<VersionTriple, ()> {
        let mut parts = s.split('.');
        let mut next = || parts.next().ok_or(())?.parse::<u32>().map_err(|_| ());
        let triple = VersionTriple {
            major: next()?,
            minor: next()?,
            patch: next()?,
        };
        if parts.next().is_some() {
            return Err(());
        }
        Ok(triple)
    }
}

/// Structured firmware identification reported by `*IDN?`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FirmwareVersion {
    /// Control-server software version.
    pub server: VersionTriple,
    /// Installed FPGA app version.
    pub fpga: VersionTriple,
    /// FPGA build id (8 hex digits on the wire).
    pub fpga_build: u32,
    /// Supporting firmware id (8 hex digits on the wire).
    pub fpga_supporting: u32,
    /// Root filesystem description.
    pub rootfs: String,
}

/// A non-fatal divergence between a design's recorded firmware and the
/// firmware installed on the live device.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FirmwareWarning {
    pub field: &'static str,
    pub design: String,
    pub installed: String,
}

impl Display for FirmwareWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "design {} is {}, installed is {}",
            self.field, self.design, self.installed
        )
    }
}

impl FirmwareVersion {
    /// True when all FPGA fields (version, build id, supporting id) match.
    ///
    /// A design that fails this check references blocks of a different FPGA
    /// app and must not be restored.
    pub fn fpga_compatible(&self, other: &FirmwareVersion) -> bool {
        self.fpga == other.fpga
            && self.fpga_build == other.fpga_build
            && self.fpga_supporting == other.fpga_supporting
    }

    /// Software and rootfs divergences, reported but not fatal.
    pub fn soft_mismatches(&self, installed: &FirmwareVersion) -> Vec<FirmwareWarning> {
        let mut warnings = Vec::new();
        if self.server != installed.server {
            warnings.push(FirmwareWarning {
                field: "software version",
                design: self.server.to_string(),
                installed: installed.server.to_string(),
            });
        }
        if self.rootfs != installed.rootfs {
            warnings.push(FirmwareWarning {
                field: "rootfs",
                design: self.rootfs.clone(),
                installed: installed.rootfs.clone(),
            });
        }
        warnings
    }

    /// The FPGA fields in their wire form, for error reporting.
    pub fn fpga_summary(&self) -> String {
        format!(
            "{} {:08x} {:08x}",
            self.fpga, self.fpga_build, self.fpga_supporting
        )
    }
}

impl Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{SW_PREFIX}{}{FPGA_SEPARATOR}{} {:08x} {:08x}{ROOTFS_SEPARATOR}{}",
            self.server, self.fpga, self.fpga_build, self.fpga_supporting, self.rootfs
        )
    }
}

impl FromStr for FirmwareVersion {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<FirmwareVersion, ProtocolError> {
        let malformed = |reason: &'static str| ProtocolError::MalformedIdn {
            idn: s.to_string(),
            reason,
        };

        let rest = s
            .strip_prefix(SW_PREFIX)
            .ok_or_else(|| malformed("missing 'PandA SW:' prefix"))?;
        let (server, rest) = rest
            .split_once(FPGA_SEPARATOR)
            .ok_or_else(|| malformed("missing 'FPGA:' field"))?;
        let (fpga, rootfs) = rest
            .split_once(ROOTFS_SEPARATOR)
            .ok_or_else(|| malformed("missing 'rootfs:' field"))?;

        let server: VersionTriple = server
            .parse()
            .map_err(|()| malformed("invalid software version"))?;

        let mut fpga_fields = fpga.split_ascii_whitespace();
        let fpga_version: VersionTriple = fpga_fields
            .next()
            .ok_or_else(|| malformed("missing FPGA version"))?
            .parse()
            .map_err(|()| malformed("invalid FPGA version"))?;
        let fpga_build = fpga_fields
            .next()
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .ok_or_else(|| malformed("invalid FPGA build id"))?;
        let fpga_supporting = fpga_fields
            .next()
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .ok_or_else(|| malformed("invalid supporting firmware id"))?;
        if fpga_fields.next().is_some() {
            return Err(malformed("trailing FPGA fields"));
        }

        Ok(FirmwareVersion {
            server,
            fpga: fpga_version,
            fpga_build,
            fpga_supporting,
            rootfs: rootfs.to_string(),
        })
    }
}
