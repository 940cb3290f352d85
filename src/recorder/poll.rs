//! The poll loop and the inbound command handler.
//!
//! Both run against the same [`SharedStream`], so a command arriving in the
//! middle of a poll cycle waits for the current transaction to finish.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::{debug, error, info, warn};

use super::config::RecorderConfig;
use super::publish::{Bank, Publisher, state_payload, state_topic};
use crate::device::{
    Discrete, DiscreteAction, DiscreteKind, control_discrete, read_discrete_states,
};
use crate::protocol::{Station, metrics};
use crate::transport::{Link, SharedStream};

/// Longest uninterrupted sleep while waiting for the next cycle.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// What one poll cycle achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// States handed to the publisher
    pub published: usize,
    /// Banks whose read failed
    pub failed_reads: usize,
    /// Publish calls that failed
    pub failed_publishes: usize,
}

/// Reads the X and Y banks on a fixed period.
pub struct Poller<L: Link> {
    stream: SharedStream<L>,
    config: Arc<RecorderConfig>,
    station: Station,
}

impl<L: Link> Poller<L> {
    /// Create a poller; the configuration must already be valid.
    pub fn new(stream: SharedStream<L>, config: Arc<RecorderConfig>) -> Result<Self> {
        let station = config.station()?;
        Ok(Self {
            stream,
            config,
            station,
        })
    }

    /// Read both banks once and publish every state.
    ///
    /// A failed read is logged and skipped; the other bank still publishes.
    pub fn poll_once<P: Publisher>(&self, publisher: &mut P) -> CycleReport {
        let mut report = CycleReport::default();
        let banks = [
            (Bank::Inputs, DiscreteKind::X, self.config.input_count),
            (Bank::Outputs, DiscreteKind::Y, self.config.output_count),
        ];

        for (bank, kind, count) in banks {
            if count == 0 {
                continue;
            }
            let states = Discrete::new(kind, 0).and_then(|start| {
                read_discrete_states(&self.stream, self.station, start, count)
            });
            let states = match states {
                Ok(states) => states,
                Err(err) => {
                    error!(bank = bank.as_str(), %err, "error reading states");
                    report.failed_reads += 1;
                    continue;
                }
            };
            debug!(bank = bank.as_str(), ?states, "states read");

            for (discrete, on) in states {
                let topic = state_topic(&self.config.topic, bank, discrete);
                let published = state_payload(self.config.payload_format, discrete, on)
                    .and_then(|payload| publisher.publish(&topic, &payload));
                match published {
                    Ok(()) => report.published += 1,
                    Err(err) => {
                        warn!(topic = %topic, %err, "publish failed");
                        report.failed_publishes += 1;
                    }
                }
            }
        }
        report
    }

    /// Poll every query period until `shutdown` is set.
    pub fn run<P: Publisher>(&self, publisher: &mut P, shutdown: &AtomicBool) {
        info!(
            period = ?self.config.query_period(),
            station = %self.station,
            "poll loop started"
        );
        let mut cycles = 0u64;
        while !shutdown.load(Ordering::Relaxed) {
            let started = Instant::now();
            let report = self.poll_once(publisher);
            cycles += 1;
            debug!(cycles, ?report, "poll cycle done");

            let deadline = started + self.config.query_period();
            while !shutdown.load(Ordering::Relaxed) {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                thread::sleep(remaining.min(SHUTDOWN_POLL));
            }
        }

        let totals = metrics::snapshot();
        info!(
            cycles,
            transactions = totals.transactions,
            retries = totals.retries,
            timeouts = totals.timeouts,
            device_errors = totals.device_errors,
            avg_latency_us = ?totals.avg_latency_us(),
            "poll loop stopped"
        );
    }
}

/// Parse `<discrete> <action>`, e.g. `Y0 set` or `Y3 0`.
///
/// Blank lines and lines starting with `#` yield `None`.
pub fn parse_command(line: &str) -> Result<Option<(Discrete, DiscreteAction)>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let (Some(discrete), Some(action), None) = (words.next(), words.next(), words.next()) else {
        bail!("expected `<discrete> <set|reset|enable|disable>`, got {line:?}");
    };
    let discrete = discrete.parse::<Discrete>().context("bad discrete")?;
    let action = action.parse::<DiscreteAction>().context("bad action")?;
    Ok(Some((discrete, action)))
}

/// Apply one command line to the PLC.
pub fn apply_command_line<L: Link>(
    stream: &SharedStream<L>,
    station: Station,
    line: &str,
) -> Result<Option<(Discrete, DiscreteAction)>> {
    let Some((discrete, action)) = parse_command(line)? else {
        return Ok(None);
    };
    control_discrete(stream, station, discrete, action)
        .with_context(|| format!("{action:?} {discrete} failed"))?;
    info!(%discrete, ?action, "command applied");
    Ok(Some((discrete, action)))
}

/// Apply commands read line by line until EOF or `shutdown`.
///
/// Bad commands are logged and skipped. Returns the number applied.
pub fn handle_commands<L: Link, R: BufRead>(
    stream: &SharedStream<L>,
    station: Station,
    reader: R,
    shutdown: &AtomicBool,
) -> usize {
    let mut applied = 0;
    for line in reader.lines() {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                error!(%err, "command input closed");
                break;
            }
        };
        match apply_command_line(stream, station, &line) {
            Ok(Some(_)) => applied += 1,
            Ok(None) => {}
            Err(err) => error!("{err:#}"),
        }
    }
    applied
}
