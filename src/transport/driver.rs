//! Port 0 transaction driver: framing, bounded retransmission and response
//! validation over a [`Link`].

use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::{debug, error, instrument, trace, warn};

use super::link::{Link, is_timeout, read_frame};
use crate::protocol::metrics::{Metrics, Outcome};
use crate::protocol::{
    CHECKSUM_LEN, ChecksumStyle, CommandCode, DecodeOptions, Error, Request, Response, Result, STX,
    Station, decode_response, encode_request,
};

/// Default number of transmit attempts.
pub const DEFAULT_RETRY_COUNT: u32 = 5;

/// Default per-attempt read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Driver configuration options.
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    /// Maximum number of frames written per transaction.
    pub retry_count: u32,
    /// How long to wait for ETX after each write.
    pub timeout: Duration,
    /// Checksum rendering for outgoing frames.
    pub checksum_style: ChecksumStyle,
    /// Reject responses whose checksum does not match.
    pub verify_checksum: bool,
    /// Reject responses from a station other than the addressed one.
    pub verify_station: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            retry_count: DEFAULT_RETRY_COUNT,
            timeout: DEFAULT_TIMEOUT,
            checksum_style: ChecksumStyle::Padded,
            verify_checksum: false,
            verify_station: false,
        }
    }
}

/// Transaction states.
///
/// ```text
/// Idle -> Sent -> WaitingResponse -> Success
///                                 -> DeviceError
///                                 -> Malformed
///                                 -> TimeoutRetry -> Sent
///                                 -> TimeoutExhausted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Nothing written yet
    Idle,
    /// Frame written
    Sent,
    /// Reading until ETX
    WaitingResponse,
    /// Nothing came back; attempts remain
    TimeoutRetry,
    /// Well-formed response with error `0`
    Success,
    /// Well-formed response with a nonzero error
    DeviceError,
    /// Response that could not be parsed or verified
    Malformed,
    /// Nothing came back within the retry budget
    TimeoutExhausted,
}

impl TransactionState {
    /// Whether the transaction has finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success | Self::DeviceError | Self::Malformed | Self::TimeoutExhausted
        )
    }
}

/// Executes one request/response exchange at a time.
///
/// The driver assumes exclusive use of the link for the length of a
/// transaction; wrap the link in a [`super::SharedStream`] when more than one
/// context issues requests.
#[derive(Debug, Clone, Default)]
pub struct Driver {
    config: DriverConfig,
}

impl Driver {
    /// Create a driver with the given configuration.
    #[must_use]
    pub const fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    /// Driver configuration.
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Run one transaction.
    ///
    /// Empty reads are retried until `retry_count` frames have been written.
    /// Device errors and unparseable responses end the transaction at once.
    #[instrument(
        level = "debug",
        skip(self, link),
        fields(station = %request.station(), command = %request.command())
    )]
    pub fn transact<L: Link + ?Sized>(&self, link: &mut L, request: &Request) -> Result<Response> {
        if self.config.retry_count == 0 {
            return Err(Error::invalid("retry_count", "0"));
        }

        let started = Instant::now();
        let result = self.run(link, request);
        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(Error::Timeout { .. }) => Outcome::Timeout,
            Err(Error::DeviceError { .. }) => Outcome::DeviceError,
            Err(Error::MalformedResponse { .. }) => Outcome::Malformed,
            Err(_) => Outcome::Other,
        };
        Metrics::record_outcome(outcome, started.elapsed());
        result
    }

    fn run<L: Link + ?Sized>(&self, link: &mut L, request: &Request) -> Result<Response> {
        let frame = encode_request(request, self.config.checksum_style);
        let options = DecodeOptions {
            verify_checksum: self.config.verify_checksum,
            expect_station: self.config.verify_station.then(|| request.station()),
        };

        let mut state = TransactionState::Idle;
        let mut attempts = 0u32;
        let mut received = BytesMut::with_capacity(64);
        let mut finished: Option<Result<Response>> = None;

        loop {
            trace!(?state, attempts, "transaction state");
            state = match state {
                TransactionState::Idle | TransactionState::TimeoutRetry => {
                    Metrics::record_attempt(attempts > 0);
                    attempts += 1;
                    trace!(frame = ?frame, attempt = attempts, "sent to port0");
                    match link.send(&frame) {
                        Ok(()) => TransactionState::Sent,
                        // A write that times out is an attempt that got no answer
                        Err(err) if is_timeout(&err) => {
                            warn!(attempt = attempts, "write timeout");
                            self.after_silence(attempts)
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                TransactionState::Sent => {
                    received.clear();
                    TransactionState::WaitingResponse
                }
                TransactionState::WaitingResponse => {
                    read_frame(link, self.config.timeout, &mut received)?;
                    if is_empty_reply(&received) {
                        warn!(
                            attempts_left = self.config.retry_count.saturating_sub(attempts),
                            noise = ?received,
                            "empty response"
                        );
                        self.after_silence(attempts)
                    } else {
                        let (next, result) = interpret(&received, &options);
                        finished = Some(result);
                        next
                    }
                }
                TransactionState::TimeoutExhausted => {
                    return Err(Error::Timeout { attempts });
                }
                TransactionState::Success
                | TransactionState::DeviceError
                | TransactionState::Malformed => {
                    return finished.unwrap_or(Err(Error::Timeout { attempts }));
                }
            };
        }
    }

    fn after_silence(&self, attempts: u32) -> TransactionState {
        if attempts < self.config.retry_count {
            TransactionState::TimeoutRetry
        } else {
            TransactionState::TimeoutExhausted
        }
    }
}

/// Whether nothing is left once STX, checksum and ETX are removed.
///
/// Stray bytes with no STX, a bare `STX ETX` or a lone checksum count as
/// silence and are retried.
fn is_empty_reply(received: &[u8]) -> bool {
    match received.iter().position(|b| *b == STX) {
        Some(start) => received.len() - start - 1 <= CHECKSUM_LEN + 1,
        None => true,
    }
}

/// Classify a non-empty read.
fn interpret(received: &[u8], options: &DecodeOptions) -> (TransactionState, Result<Response>) {
    trace!(response = ?received, "received from port0");
    match decode_response(received, options) {
        Ok(response) if response.is_success() => {
            debug!(data = response.data(), "parsed response");
            (TransactionState::Success, Ok(response))
        }
        Ok(response) => {
            error!(code = %response.error(), "error response");
            let body = String::from_utf8_lossy(received);
            let err = Error::DeviceError {
                code: response.error(),
                response: strip_framing(&body),
            };
            (TransactionState::DeviceError, Err(err))
        }
        Err(err) => {
            error!(%err, "unusable response");
            (TransactionState::Malformed, Err(err))
        }
    }
}

/// Response body without STX, checksum and ETX.
fn strip_framing(frame: &str) -> String {
    // Noise before the first STX is not part of the response
    let body = frame.find('\u{2}').map_or(frame, |start| &frame[start + 1..]);
    let body = body.strip_suffix('\u{3}').unwrap_or(body);
    body[..body.len().saturating_sub(CHECKSUM_LEN)].to_owned()
}

/// Run a single transaction with explicit parameters.
pub fn transact<L: Link + ?Sized>(
    link: &mut L,
    station: &str,
    command: &str,
    data: &str,
    retry_count: u32,
    timeout: Duration,
) -> Result<Response> {
    let request = Request::new(Station::new(station)?, CommandCode::new(command)?, data)?;
    let driver = Driver::new(DriverConfig {
        retry_count,
        timeout,
        ..DriverConfig::default()
    });
    driver.transact(link, &request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ErrorCode, encode_response};
    use std::collections::VecDeque;
    use std::io;

    /// Link answering each write with the next scripted reply.
    #[derive(Default)]
    struct Scripted {
        replies: VecDeque<Vec<u8>>,
        send_errors: VecDeque<io::ErrorKind>,
        pending: Option<Vec<u8>>,
        writes: Vec<Vec<u8>>,
    }

    impl Scripted {
        fn with(replies: impl IntoIterator<Item = Vec<u8>>) -> Self {
            Self {
                replies: replies.into_iter().collect(),
                ..Self::default()
            }
        }
    }

    impl Link for Scripted {
        fn send(&mut self, frame: &[u8]) -> io::Result<()> {
            self.writes.push(frame.to_vec());
            if let Some(kind) = self.send_errors.pop_front() {
                return Err(io::Error::from(kind));
            }
            self.pending = self.replies.pop_front();
            Ok(())
        }

        fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
            match self.pending.as_mut() {
                Some(reply) if !reply.is_empty() => {
                    let n = reply.len().min(buf.len());
                    buf[..n].copy_from_slice(&reply[..n]);
                    reply.drain(..n);
                    Ok(n)
                }
                _ => {
                    self.pending = None;
                    Err(io::Error::from(io::ErrorKind::TimedOut))
                }
            }
        }
    }

    fn request() -> Request {
        Request::parse("01", "44", "0CX0000").unwrap()
    }

    fn driver(retry_count: u32) -> Driver {
        Driver::new(DriverConfig {
            retry_count,
            timeout: Duration::from_millis(50),
            ..DriverConfig::default()
        })
    }

    #[test]
    fn test_success_first_attempt() {
        let reply = encode_response("01", "44", ErrorCode::Normal, "101010101010").to_vec();
        let mut link = Scripted::with([reply]);
        let response = driver(3).transact(&mut link, &request()).unwrap();
        assert_eq!(response.data(), "101010101010");
        assert_eq!(link.writes.len(), 1);
        assert_eq!(link.writes[0], b"\x0201440CX000056\x03");
    }

    #[test]
    fn test_retry_then_success() {
        let reply = encode_response("01", "44", ErrorCode::Normal, "1").to_vec();
        let mut link = Scripted::with([vec![], vec![], reply]);
        let response = driver(3).transact(&mut link, &request()).unwrap();
        assert_eq!(response.data(), "1");
        assert_eq!(link.writes.len(), 3);
    }

    #[test]
    fn test_timeout_after_exact_attempts() {
        let mut link = Scripted::default();
        let err = driver(4).transact(&mut link, &request()).unwrap_err();
        assert!(matches!(err, Error::Timeout { attempts: 4 }));
        assert_eq!(link.writes.len(), 4);
    }

    #[test]
    fn test_device_error_not_retried() {
        let reply = encode_response("01", "44", ErrorCode::Other('1'), "").to_vec();
        let mut link = Scripted::with([reply]);
        let err = driver(5).transact(&mut link, &request()).unwrap_err();
        match err {
            Error::DeviceError { code, response } => {
                assert_eq!(code, ErrorCode::Other('1'));
                assert_eq!(response, "01441");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(link.writes.len(), 1);
    }

    #[test]
    fn test_short_response_is_malformed() {
        let mut link = Scripted::with([b"\x02014\x03".to_vec()]);
        let err = driver(5).transact(&mut link, &request()).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
        assert_eq!(link.writes.len(), 1);
    }

    #[test]
    fn test_zero_retry_count_rejected() {
        let mut link = Scripted::default();
        let err = driver(0).transact(&mut link, &request()).unwrap_err();
        assert!(matches!(err, Error::InvalidField { field: "retry_count", .. }));
        assert!(link.writes.is_empty());
    }

    #[test]
    fn test_free_function_strips_whitespace() {
        let reply = encode_response("01", "44", ErrorCode::Normal, "0").to_vec();
        let mut link = Scripted::with([reply]);
        transact(&mut link, "01", "44", "0C X0000", 1, Duration::from_millis(10)).unwrap();
        assert_eq!(link.writes[0], b"\x0201440CX000056\x03");
    }

    #[test]
    fn test_strip_framing() {
        assert_eq!(strip_framing("\u{2}014410A\u{3}"), "01441");
        assert_eq!(strip_framing("zz\u{2}014410A\u{3}"), "01441");
    }

    #[test]
    fn test_noise_only_reply_is_retried() {
        let noise: [&[u8]; 4] = [b"\x03", b"\x02\x03", b"\x02AB\x03", b"zz"];
        for junk in noise {
            let reply = encode_response("01", "44", ErrorCode::Normal, "1").to_vec();
            let mut link = Scripted::with([junk.to_vec(), reply]);
            let response = driver(3).transact(&mut link, &request()).unwrap();
            assert_eq!(response.data(), "1", "after {junk:?}");
            assert_eq!(link.writes.len(), 2, "after {junk:?}");
        }
    }

    #[test]
    fn test_noise_only_replies_exhaust_retries() {
        let mut link = Scripted::with([b"\x03".to_vec(), b"\x02\x03".to_vec()]);
        let err = driver(2).transact(&mut link, &request()).unwrap_err();
        assert!(matches!(err, Error::Timeout { attempts: 2 }));
    }

    #[test]
    fn test_device_error_ignores_leading_noise() {
        let mut reply = b"zz".to_vec();
        reply.extend_from_slice(&encode_response("01", "44", ErrorCode::IllegalValue, ""));
        let mut link = Scripted::with([reply]);
        let err = driver(3).transact(&mut link, &request()).unwrap_err();
        match err {
            Error::DeviceError { code, response } => {
                assert_eq!(code, ErrorCode::IllegalValue);
                assert_eq!(response, "01442");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_write_timeouts_count_as_attempts() {
        let mut link = Scripted {
            send_errors: [io::ErrorKind::TimedOut; 3].into(),
            ..Scripted::default()
        };
        let err = driver(3).transact(&mut link, &request()).unwrap_err();
        assert!(matches!(err, Error::Timeout { attempts: 3 }));
        assert_eq!(link.writes.len(), 3);
    }

    #[test]
    fn test_write_timeout_then_success() {
        let reply = encode_response("01", "44", ErrorCode::Normal, "0").to_vec();
        let mut link = Scripted {
            replies: [reply].into(),
            send_errors: [io::ErrorKind::TimedOut].into(),
            ..Scripted::default()
        };
        driver(3).transact(&mut link, &request()).unwrap();
        assert_eq!(link.writes.len(), 2);
    }

    #[test]
    fn test_hard_write_error_not_retried() {
        let mut link = Scripted {
            send_errors: [io::ErrorKind::BrokenPipe].into(),
            ..Scripted::default()
        };
        let err = driver(5).transact(&mut link, &request()).unwrap_err();
        match err {
            Error::Io(err) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(link.writes.len(), 1);
    }

    #[test]
    fn test_oversized_reply_is_malformed() {
        let mut runaway = vec![STX];
        runaway.extend(std::iter::repeat_n(b'1', 2000));
        let mut link = Scripted::with([runaway]);
        let err = driver(5).transact(&mut link, &request()).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedResponse {
                reason: "missing ETX",
                ..
            }
        ));
        assert_eq!(link.writes.len(), 1);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransactionState::Success.is_terminal());
        assert!(TransactionState::TimeoutExhausted.is_terminal());
        assert!(!TransactionState::TimeoutRetry.is_terminal());
    }
}
