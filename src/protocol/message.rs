//! Port 0 request and response values

use super::{CommandCode, Error, ErrorCode, Result, Station};

/// One outgoing transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    station: Station,
    command: CommandCode,
    data: String,
}

impl Request {
    /// Create a request. Whitespace in `data` is removed.
    pub fn new(station: Station, command: CommandCode, data: &str) -> Result<Self> {
        let data: String = data.chars().filter(|c| !c.is_whitespace()).collect();
        if !data.is_ascii() {
            return Err(Error::NonAscii { field: "data" });
        }
        if data.bytes().any(|b| b.is_ascii_control()) {
            return Err(Error::invalid("data", data));
        }
        Ok(Self {
            station,
            command,
            data,
        })
    }

    /// Parse all three fields from text
    pub fn parse(station: &str, command: &str, data: &str) -> Result<Self> {
        Self::new(Station::new(station)?, CommandCode::new(command)?, data)
    }

    /// Target station
    #[must_use]
    pub const fn station(&self) -> Station {
        self.station
    }

    /// Command code
    #[must_use]
    pub const fn command(&self) -> CommandCode {
        self.command
    }

    /// Payload with whitespace removed
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }
}

/// Parsed device response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    station: String,
    command: String,
    error: ErrorCode,
    data: String,
}

impl Response {
    pub(crate) fn from_parts(station: &str, command: &str, error: ErrorCode, data: &str) -> Self {
        Self {
            station: station.to_owned(),
            command: command.to_owned(),
            error,
            data: data.to_owned(),
        }
    }

    /// Responding station
    #[must_use]
    pub fn station(&self) -> &str {
        &self.station
    }

    /// Echoed command code
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Error field
    #[must_use]
    pub const fn error(&self) -> ErrorCode {
        self.error
    }

    /// Command-specific payload
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Whether the device reported success
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_normal()
    }
}
