//! Process-wide Port 0 transaction counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Track transaction metrics without external dependencies.
pub(crate) struct Metrics;

static TRANSACTIONS: AtomicU64 = AtomicU64::new(0);
static ATTEMPTS: AtomicU64 = AtomicU64::new(0);
static RETRIES: AtomicU64 = AtomicU64::new(0);
static SUCCESSES: AtomicU64 = AtomicU64::new(0);
static TIMEOUTS: AtomicU64 = AtomicU64::new(0);
static DEVICE_ERRORS: AtomicU64 = AtomicU64::new(0);
static MALFORMED: AtomicU64 = AtomicU64::new(0);
static LATENCY_TOTAL_NS: AtomicU64 = AtomicU64::new(0);
static LATENCY_MAX_NS: AtomicU64 = AtomicU64::new(0);

const NANOSECONDS_PER_MICROSECOND: u128 = 1_000;

/// How a transaction ended.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Outcome {
    Success,
    Timeout,
    DeviceError,
    Malformed,
    /// Failures counted only as transactions (IO, verification).
    Other,
}

impl Metrics {
    #[inline]
    pub(crate) fn record_attempt(retry: bool) {
        ATTEMPTS.fetch_add(1, Ordering::Relaxed);
        if retry {
            RETRIES.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_outcome(outcome: Outcome, elapsed: Duration) {
        TRANSACTIONS.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            Outcome::Success => &SUCCESSES,
            Outcome::Timeout => &TIMEOUTS,
            Outcome::DeviceError => &DEVICE_ERRORS,
            Outcome::Malformed => &MALFORMED,
            Outcome::Other => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if matches!(outcome, Outcome::Success) {
            let nanos = elapsed
                .as_nanos()
                .min(u128::from(u64::MAX))
                .try_into()
                .unwrap_or(u64::MAX);
            LATENCY_TOTAL_NS.fetch_add(nanos, Ordering::Relaxed);
            update_max(&LATENCY_MAX_NS, nanos);
        }
    }

    #[inline]
    pub(crate) fn totals() -> MetricsSnapshot {
        MetricsSnapshot {
            transactions: TRANSACTIONS.load(Ordering::Relaxed),
            attempts: ATTEMPTS.load(Ordering::Relaxed),
            retries: RETRIES.load(Ordering::Relaxed),
            successes: SUCCESSES.load(Ordering::Relaxed),
            timeouts: TIMEOUTS.load(Ordering::Relaxed),
            device_errors: DEVICE_ERRORS.load(Ordering::Relaxed),
            malformed: MALFORMED.load(Ordering::Relaxed),
            latency_total_ns: LATENCY_TOTAL_NS.load(Ordering::Relaxed),
            latency_max_ns: LATENCY_MAX_NS.load(Ordering::Relaxed),
        }
    }
}

fn update_max(target: &AtomicU64, candidate: u64) {
    let mut current = target.load(Ordering::Relaxed);
    while candidate > current {
        match target.compare_exchange_weak(
            current,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(old) => current = old,
        }
    }
}

/// Current value of every counter.
#[must_use]
pub fn snapshot() -> MetricsSnapshot {
    Metrics::totals()
}

/// Lightweight snapshot of transaction counters.
#[allow(missing_docs)]
#[derive(Default, Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub transactions: u64,
    pub attempts: u64,
    pub retries: u64,
    pub successes: u64,
    pub timeouts: u64,
    pub device_errors: u64,
    pub malformed: u64,
    pub latency_total_ns: u64,
    pub latency_max_ns: u64,
}

impl MetricsSnapshot {
    /// Average round-trip time of successful transactions in microseconds.
    #[must_use]
    pub fn avg_latency_us(&self) -> Option<u64> {
        average_microseconds(self.latency_total_ns, self.successes)
    }
}

fn average_microseconds(total_ns: u64, count: u64) -> Option<u64> {
    if count == 0 {
        return None;
    }

    let total_ns_u128 = u128::from(total_ns);
    Some((total_ns_u128 / (u128::from(count) * NANOSECONDS_PER_MICROSECOND)) as u64)
}
