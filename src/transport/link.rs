//! Byte-stream abstraction the driver talks to.

use std::io::{self, ErrorKind};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::trace;

use crate::protocol::ETX;

/// Size of a single read from the link.
const READ_CHUNK: usize = 64;

/// Upper bound on a response frame; anything longer is line noise.
pub const MAX_FRAME_LEN: usize = 1024;

/// A duplex byte channel with timed reads.
pub trait Link: Send {
    /// Write the whole frame.
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Read whatever is available, waiting at most `timeout`.
    ///
    /// `Ok(0)` and `ErrorKind::TimedOut` both mean nothing arrived.
    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).send(frame)
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).receive(buf, timeout)
    }
}

/// Whether an IO error only means the peer stayed silent.
pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

/// Read into `frame` until ETX arrives or `timeout` elapses.
///
/// Returns the number of bytes appended. A partial frame is returned as-is
/// when the deadline passes before ETX.
pub fn read_frame<L: Link + ?Sized>(
    link: &mut L,
    timeout: Duration,
    frame: &mut BytesMut,
) -> io::Result<usize> {
    let deadline = Instant::now() + timeout;
    let start_len = frame.len();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let n = match link.receive(&mut chunk, remaining) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if is_timeout(&err) => break,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        // Stop at the first ETX; later bytes belong to nothing we asked for
        if let Some(pos) = chunk[..n].iter().position(|b| *b == ETX) {
            frame.extend_from_slice(&chunk[..=pos]);
            if pos + 1 < n {
                trace!(discarded = n - pos - 1, "bytes after ETX dropped");
            }
            break;
        }
        frame.extend_from_slice(&chunk[..n]);

        if frame.len() - start_len >= MAX_FRAME_LEN {
            break;
        }
    }

    Ok(frame.len() - start_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Chunks(VecDeque<io::Result<Vec<u8>>>);

    impl Link for Chunks {
        fn send(&mut self, _frame: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(err)) => Err(err),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn test_read_frame_across_chunks() {
        let mut link = Chunks(VecDeque::from([
            Ok(b"\x02014".to_vec()),
            Ok(b"40".to_vec()),
            Ok(b"1AB\x03trailing".to_vec()),
        ]));
        let mut frame = BytesMut::new();
        let n = read_frame(&mut link, Duration::from_secs(1), &mut frame).unwrap();
        assert_eq!(n, 10);
        assert_eq!(&frame[..], b"\x02014401AB\x03");
    }

    #[test]
    fn test_read_frame_timeout_is_empty() {
        let mut link = Chunks(VecDeque::from([Err(io::Error::from(ErrorKind::TimedOut))]));
        let mut frame = BytesMut::new();
        assert_eq!(read_frame(&mut link, Duration::from_secs(1), &mut frame).unwrap(), 0);
    }

    #[test]
    fn test_read_frame_partial_on_silence() {
        let mut link = Chunks(VecDeque::from([Ok(b"\x02014".to_vec())]));
        let mut frame = BytesMut::new();
        assert_eq!(read_frame(&mut link, Duration::from_secs(1), &mut frame).unwrap(), 4);
    }

    #[test]
    fn test_read_frame_propagates_hard_errors() {
        let mut link = Chunks(VecDeque::from([Err(io::Error::from(ErrorKind::BrokenPipe))]));
        let mut frame = BytesMut::new();
        let err = read_frame(&mut link, Duration::from_secs(1), &mut frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }
}
