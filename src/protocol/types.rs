//! Port 0 field types

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// Station address (two ASCII digits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Station([u8; 2]);

impl Station {
    /// Parse a station address such as `"01"`
    pub fn new(value: &str) -> Result<Self> {
        match value.as_bytes() {
            [a, b] if a.is_ascii_digit() && b.is_ascii_digit() => Ok(Self([*a, *b])),
            _ => Err(Error::invalid("station", value)),
        }
    }

    /// Build from a numeric address (0..=99)
    pub fn from_number(number: u8) -> Result<Self> {
        if number > 99 {
            return Err(Error::invalid("station", number.to_string()));
        }
        Self::new(&format!("{number:02}"))
    }

    /// Wire representation
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }

    /// Textual representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl Default for Station {
    fn default() -> Self {
        Self(*b"01")
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-character command code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandCode([u8; 2]);

impl CommandCode {
    /// Read the gist of the system status
    pub const READ_SYSTEM_STATUS: Self = Self(*b"40");
    /// Run/stop the PLC
    pub const RUN_STOP_CONTROL: Self = Self(*b"41");
    /// Set, reset, enable or disable a single discrete
    pub const DISCRETE_CONTROL: Self = Self(*b"42");
    /// Read enable/disable status of continuous discretes
    pub const READ_DISCRETE_ENABLE: Self = Self(*b"43");
    /// Read the state of continuous discretes
    pub const READ_DISCRETE_STATUS: Self = Self(*b"44");
    /// Write the state of continuous discretes
    pub const WRITE_DISCRETE_STATUS: Self = Self(*b"45");
    /// Read continuous registers
    pub const READ_REGISTERS: Self = Self(*b"46");
    /// Write continuous registers
    pub const WRITE_REGISTERS: Self = Self(*b"47");

    /// Parse an arbitrary command code
    pub fn new(value: &str) -> Result<Self> {
        match value.as_bytes() {
            [a, b] if a.is_ascii_graphic() && b.is_ascii_graphic() => Ok(Self([*a, *b])),
            _ => Err(Error::invalid("command", value)),
        }
    }

    /// Wire representation
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }

    /// Textual representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response error field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `0`: no error
    Normal,
    /// `2`: illegal value
    IllegalValue,
    /// `4`: illegal format, or command cannot be executed
    IllegalFormat,
    /// `5`: checksum error
    ChecksumError,
    /// `6`: illegal PLC ID
    IllegalId,
    /// `7`: syntax error
    SyntaxError,
    /// `9`: cannot execute while the PLC is running
    PlcRunning,
    /// `A`: illegal address
    IllegalAddress,
    /// Any other error character
    Other(char),
}

impl ErrorCode {
    /// Convert from the wire character
    #[must_use]
    pub const fn from_char(value: char) -> Self {
        match value {
            '0' => Self::Normal,
            '2' => Self::IllegalValue,
            '4' => Self::IllegalFormat,
            '5' => Self::ChecksumError,
            '6' => Self::IllegalId,
            '7' => Self::SyntaxError,
            '9' => Self::PlcRunning,
            'A' => Self::IllegalAddress,
            other => Self::Other(other),
        }
    }

    /// Convert to the wire character
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Normal => '0',
            Self::IllegalValue => '2',
            Self::IllegalFormat => '4',
            Self::ChecksumError => '5',
            Self::IllegalId => '6',
            Self::SyntaxError => '7',
            Self::PlcRunning => '9',
            Self::IllegalAddress => 'A',
            Self::Other(c) => c,
        }
    }

    /// Whether this is the success code
    #[must_use]
    pub const fn is_normal(self) -> bool {
        matches!(self, Self::Normal)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Normal => "normal",
            Self::IllegalValue => "illegal value",
            Self::IllegalFormat => "illegal format",
            Self::ChecksumError => "checksum error",
            Self::IllegalId => "illegal PLC ID",
            Self::SyntaxError => "syntax error",
            Self::PlcRunning => "cannot execute while running",
            Self::IllegalAddress => "illegal address",
            Self::Other(_) => "unknown",
        };
        write!(f, "'{}' ({text})", self.as_char())
    }
}

/// How the frame checksum is rendered on the wire
///
/// `Unpadded` reproduces the legacy rendering where a sum below 0x10 is a
/// single hex digit. Devices expect two characters, so only use it against
/// peers known to accept the short form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumStyle {
    /// Always two uppercase hex digits
    #[default]
    Padded,
    /// Uppercase hex with no fixed width
    Unpadded,
}
