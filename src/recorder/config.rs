//! Recorder configuration
//!
//! Every setting is declared here, read once from an optional TOML file,
//! overridden from the command line, validated, and then shared read-only
//! with the poll loop and the command handler.
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//! station = "01"
//! timeout_ms = 5000
//! retransmit_count = 5
//! query_period_secs = 5
//! topic = "fatek"
//!
//! [serial]
//! baud_rate = 9600
//! data_bits = 7
//! parity = "even"
//! stop_bits = 1
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::publish::PayloadFormat;
use crate::protocol::{ChecksumStyle, Station};
use crate::transport::{DriverConfig, SerialSettings};

/// All recorder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecorderConfig {
    /// Serial device path or `socket://host:port`
    pub port: String,
    /// Line settings for serial devices
    pub serial: SerialSettings,
    /// PLC station number
    pub station: String,
    /// Per-attempt response timeout
    pub timeout_ms: u64,
    /// Frames written before a transaction gives up
    pub retransmit_count: u32,
    /// Pause between poll cycles
    pub query_period_secs: u64,
    /// Topic prefix for published states
    pub topic: String,
    /// Inputs read starting at X0
    pub input_count: u8,
    /// Outputs read starting at Y0
    pub output_count: u8,
    /// Published payload encoding
    pub payload_format: PayloadFormat,
    /// Outgoing checksum rendering
    pub checksum_style: ChecksumStyle,
    /// Check response checksums
    pub verify_checksum: bool,
    /// Check response station numbers
    pub verify_station: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            serial: SerialSettings::default(),
            station: crate::DEFAULT_STATION.to_owned(),
            timeout_ms: 5_000,
            retransmit_count: 5,
            query_period_secs: 5,
            topic: "fatek".to_owned(),
            input_count: 12,
            output_count: 8,
            payload_format: PayloadFormat::Plain,
            checksum_style: ChecksumStyle::Padded,
            verify_checksum: false,
            verify_station: false,
        }
    }
}

/// Command-line values that replace file settings when present.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<String>,
    pub station: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retransmit_count: Option<u32>,
    pub query_period_secs: Option<u64>,
    pub topic: Option<String>,
    pub payload_format: Option<PayloadFormat>,
    pub unpadded_checksum: bool,
    pub verify_checksum: bool,
    pub verify_station: bool,
}

impl RecorderConfig {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {path:?}"))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse configuration from {path:?}"))
    }

    /// Parse settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Render the settings as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Replace settings with every value given on the command line.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(station) = overrides.station {
            self.station = station;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(count) = overrides.retransmit_count {
            self.retransmit_count = count;
        }
        if let Some(period) = overrides.query_period_secs {
            self.query_period_secs = period;
        }
        if let Some(topic) = overrides.topic {
            self.topic = topic;
        }
        if let Some(format) = overrides.payload_format {
            self.payload_format = format;
        }
        if overrides.unpadded_checksum {
            self.checksum_style = ChecksumStyle::Unpadded;
        }
        self.verify_checksum |= overrides.verify_checksum;
        self.verify_station |= overrides.verify_station;
    }

    /// Check that the settings describe something that can run.
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            bail!("no serial port configured");
        }
        self.station()?;
        self.serial.validate()?;
        if self.retransmit_count == 0 {
            bail!("retransmit_count must be at least 1");
        }
        if self.timeout_ms == 0 {
            bail!("timeout_ms must be positive");
        }
        if self.input_count == 0 && self.output_count == 0 {
            bail!("nothing to poll: input_count and output_count are both 0");
        }
        if self.topic.trim().is_empty() {
            bail!("topic must not be empty");
        }
        Ok(())
    }

    /// Parsed station address.
    pub fn station(&self) -> Result<Station> {
        Ok(Station::new(&self.station)?)
    }

    /// Driver settings derived from this configuration.
    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            retry_count: self.retransmit_count,
            timeout: Duration::from_millis(self.timeout_ms),
            checksum_style: self.checksum_style,
            verify_checksum: self.verify_checksum,
            verify_station: self.verify_station,
        }
    }

    /// Pause between poll cycles.
    #[must_use]
    pub fn query_period(&self) -> Duration {
        Duration::from_secs(self.query_period_secs)
    }
}
