//! Fatek FBs Port 0 - serial transaction driver for Fatek PLCs
//!
//! This library frames Port 0 commands, runs them over a serial link with
//! bounded retransmission, and parses the device responses. A small
//! recorder application on top polls input and output relays and publishes
//! their states.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use fatek_port0::{SerialSettings, open_link, transact};
//!
//! let mut link = open_link("/dev/ttyUSB0", &SerialSettings::default())?;
//!
//! // Read 12 inputs starting at X0
//! let response = transact(&mut link, "01", "44", "0CX0000", 5, Duration::from_secs(5))?;
//! println!("inputs: {}", response.data());
//! # Ok::<(), fatek_port0::Error>(())
//! ```
//!
//! # Frame Format
//!
//! ```text
//! request:  STX station(2) command(2) data(N) checksum(2) ETX
//! response: STX station(2) command(2) error(1) data(N) checksum(2) ETX
//! ```
//!
//! The checksum is the byte sum of everything from STX through the last
//! data character, modulo 256, as two uppercase hex digits.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod device;
pub mod protocol;
pub mod recorder;
pub mod transport;

pub use device::{Discrete, DiscreteAction, DiscreteKind, control_discrete, read_discrete_states};
pub use protocol::{
    ChecksumStyle, CommandCode, ETX, Error, ErrorCode, Request, Response, Result, STX, Station,
};
pub use transport::{
    Driver, DriverConfig, Link, SerialSettings, SharedStream, TransactionState, open_link,
    transact,
};

/// Factory default station number
pub const DEFAULT_STATION: &str = "01";
