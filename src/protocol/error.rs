//! Port 0 error types

use thiserror::Error;

use super::ErrorCode;

/// Port 0 transaction errors
#[derive(Error, Debug)]
pub enum Error {
    /// No non-empty response within the retry budget
    #[error("timeout: no response after {attempts} attempt(s)")]
    Timeout {
        /// Number of frames written before giving up
        attempts: u32,
    },

    /// Device answered with a nonzero error field
    #[error("device error {code}: {response:?}")]
    DeviceError {
        /// Parsed error field
        code: ErrorCode,
        /// Response body (without STX, checksum and ETX)
        response: String,
    },

    /// Response could not be parsed
    #[error("malformed response ({reason}): {raw:?}")]
    MalformedResponse {
        /// What was wrong with it
        reason: &'static str,
        /// Raw bytes as received
        raw: Vec<u8>,
    },

    /// Response checksum does not match its contents
    #[error("checksum mismatch: expected {expected:#04x}, got {found:?}")]
    ChecksumMismatch {
        /// Checksum computed over the received frame
        expected: u8,
        /// Checksum characters carried by the frame
        found: String,
    },

    /// Response came from another station
    #[error("station mismatch: expected {expected}, got {found}")]
    StationMismatch {
        /// Station the request was addressed to
        expected: String,
        /// Station found in the response
        found: String,
    },

    /// A request field has the wrong shape
    #[error("invalid {field}: {value:?}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// A request field is not ASCII
    #[error("{field} is not ASCII")]
    NonAscii {
        /// Field name
        field: &'static str,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(reason: &'static str, raw: &[u8]) -> Self {
        Self::MalformedResponse {
            reason,
            raw: raw.to_vec(),
        }
    }

    pub(crate) fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            value: value.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
