//! Where polled states go.
//!
//! The broker connection itself lives outside this crate. Publishers here
//! produce `(topic, payload)` pairs; [`JsonLinesPublisher`] writes them one
//! JSON object per line for a bridge process to forward.

use std::io::Write;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::device::Discrete;

/// Payload encoding for a single state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// `0` or `1`
    #[default]
    Plain,
    /// RFC 8428 SenML record with a boolean value
    Senml,
}

/// Which bank a discrete was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    /// X relays
    Inputs,
    /// Y relays
    Outputs,
}

impl Bank {
    /// Topic segment
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inputs => "inputs",
            Self::Outputs => "outputs",
        }
    }
}

/// Sink for published states.
pub trait Publisher {
    /// Publish one payload on `topic`.
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()>;
}

/// Collects everything published; handy for dry runs.
impl Publisher for Vec<(String, String)> {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        self.push((topic.to_owned(), payload.to_owned()));
        Ok(())
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    topic: &'a str,
    payload: &'a str,
}

/// Writes `{"topic":..,"payload":..}` lines.
pub struct JsonLinesPublisher<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesPublisher<W> {
    /// Publish to `out`.
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Publisher for JsonLinesPublisher<W> {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        trace!(topic, payload, "publish");
        serde_json::to_writer(&mut self.out, &Envelope { topic, payload })?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct SenmlRecord<'a> {
    n: &'a str,
    vb: bool,
}

/// Topic for one discrete, e.g. `fatek/inputs/X0`.
#[must_use]
pub fn state_topic(prefix: &str, bank: Bank, discrete: Discrete) -> String {
    format!("{}/{}/{discrete}", prefix.trim_end_matches('/'), bank.as_str())
}

/// Payload for one discrete state.
pub fn state_payload(format: PayloadFormat, discrete: Discrete, on: bool) -> Result<String> {
    match format {
        PayloadFormat::Plain => Ok(if on { "1" } else { "0" }.to_owned()),
        PayloadFormat::Senml => {
            let name = discrete.to_string();
            Ok(serde_json::to_string(&SenmlRecord { n: &name, vb: on })?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DiscreteKind;

    fn x(index: u16) -> Discrete {
        Discrete::new(DiscreteKind::X, index).unwrap()
    }

    #[test]
    fn test_state_topic() {
        assert_eq!(state_topic("fatek", Bank::Inputs, x(3)), "fatek/inputs/X3");
        assert_eq!(state_topic("plant/", Bank::Outputs, x(0)), "plant/outputs/X0");
    }

    #[test]
    fn test_payloads() {
        assert_eq!(state_payload(PayloadFormat::Plain, x(0), true).unwrap(), "1");
        assert_eq!(state_payload(PayloadFormat::Plain, x(0), false).unwrap(), "0");
        assert_eq!(
            state_payload(PayloadFormat::Senml, x(11), true).unwrap(),
            r#"{"n":"X11","vb":true}"#
        );
    }

    #[test]
    fn test_json_lines() {
        let mut publisher = JsonLinesPublisher::new(Vec::new());
        publisher.publish("fatek/inputs/X0", "1").unwrap();
        publisher.publish("fatek/inputs/X1", "0").unwrap();
        let text = String::from_utf8(publisher.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["topic"], "fatek/inputs/X0");
        assert_eq!(first["payload"], "1");
    }
}
