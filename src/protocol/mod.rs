//! Fatek FBs Port 0 wire format
//!
//! This module provides the frame layout, value types and codec. It performs
//! no I/O; see [`crate::transport`] for the byte-stream side.

mod checksum;
mod codec;
mod error;
pub mod metrics;
mod message;
mod types;

pub use checksum::{lrc, render_checksum};
pub use codec::{DecodeOptions, decode_response, encode_request, encode_response};
pub use error::{Error, Result};
pub use message::{Request, Response};
pub use types::{ChecksumStyle, CommandCode, ErrorCode, Station};

/// Start-of-text control byte opening every frame
pub const STX: u8 = 0x02;

/// End-of-text control byte closing every frame
pub const ETX: u8 = 0x03;

/// Width of the station field in characters
pub const STATION_LEN: usize = 2;

/// Width of the command field in characters
pub const COMMAND_LEN: usize = 2;

/// Width of the response error field in characters
pub const ERROR_LEN: usize = 1;

/// Minimum response header (station + command + error)
pub const MIN_RESPONSE_HEADER: usize = STATION_LEN + COMMAND_LEN + ERROR_LEN;

/// Checksum width as sent by the device
pub const CHECKSUM_LEN: usize = 2;
