//! Concrete links: a local serial port or a serial-over-TCP converter.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::link::Link;
use crate::protocol::{Error, Result};

/// URL scheme selecting a TCP link instead of a serial device.
pub const SOCKET_SCHEME: &str = "socket://";

/// Smallest timeout handed to the OS; zero means "block forever" there.
const MIN_OS_TIMEOUT: Duration = Duration::from_millis(1);

/// Parity setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity bit
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

/// Line settings for a serial link.
///
/// Defaults match the FBs Port 0 factory settings: 9600 baud, 7E1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Bits per second
    pub baud_rate: u32,
    /// Data bits (5..=8)
    pub data_bits: u8,
    /// Parity
    pub parity: Parity,
    /// Stop bits (1 or 2)
    pub stop_bits: u8,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: 7,
            parity: Parity::Even,
            stop_bits: 1,
        }
    }
}

impl SerialSettings {
    /// Reject settings no UART supports.
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(Error::invalid("baud_rate", self.baud_rate.to_string()));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(Error::invalid("data_bits", self.data_bits.to_string()));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(Error::invalid("stop_bits", self.stop_bits.to_string()));
        }
        Ok(())
    }
}

/// Local serial port.
#[cfg(feature = "serial")]
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
}

#[cfg(feature = "serial")]
impl SerialLink {
    /// Open a serial device such as `/dev/ttyUSB0`.
    #[instrument(level = "info", skip(settings))]
    pub fn open(path: &str, settings: &SerialSettings) -> Result<Self> {
        use serialport::{DataBits, StopBits};

        settings.validate()?;
        let data_bits = match settings.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };
        let parity = match settings.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        };
        let stop_bits = if settings.stop_bits == 2 {
            StopBits::Two
        } else {
            StopBits::One
        };

        let port = serialport::new(path, settings.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_secs(1))
            .open()
            .map_err(io::Error::from)?;
        debug!(?settings, "serial port opened");
        Ok(Self { port })
    }
}

#[cfg(feature = "serial")]
impl Link for SerialLink {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.port.write_all(frame)?;
        self.port.flush()
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.port
            .set_timeout(timeout.max(MIN_OS_TIMEOUT))
            .map_err(io::Error::from)?;
        self.port.read(buf)
    }
}

/// TCP connection to a serial device server.
#[derive(Debug)]
pub struct TcpLink {
    stream: TcpStream,
}

impl TcpLink {
    /// Connect to `host:port`.
    #[instrument(level = "info")]
    pub fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        debug!(peer = ?stream.peer_addr().ok(), "tcp link connected");
        Ok(Self { stream })
    }

    /// Wrap an already connected stream.
    #[must_use]
    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl Link for TcpLink {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame)?;
        self.stream.flush()
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.stream.set_read_timeout(Some(timeout.max(MIN_OS_TIMEOUT)))?;
        self.stream.read(buf)
    }
}

/// Open the link named by `url`.
///
/// `socket://host:port` connects over TCP; anything else is a serial device
/// path.
pub fn open_link(url: &str, settings: &SerialSettings) -> Result<Box<dyn Link>> {
    if let Some(addr) = url.strip_prefix(SOCKET_SCHEME) {
        return Ok(Box::new(TcpLink::connect(addr)?));
    }

    #[cfg(feature = "serial")]
    {
        Ok(Box::new(SerialLink::open(url, settings)?))
    }
    #[cfg(not(feature = "serial"))]
    {
        let _ = settings;
        Err(Error::invalid("port", url))
    }
}
