//! Port 0 frame codec (encode/decode)

use bytes::{BufMut, Bytes, BytesMut};

use super::{
    CHECKSUM_LEN, COMMAND_LEN, ChecksumStyle, ERROR_LEN, ETX, Error, ErrorCode, MIN_RESPONSE_HEADER,
    Request, Response, Result, STATION_LEN, STX, Station, lrc, render_checksum,
};

/// Encode a request frame
///
/// # Format
///
/// ```text
/// [STX] [STATION (2)] [COMMAND (2)] [DATA (N)] [CHECKSUM (1-2)] [ETX]
/// ```
#[must_use]
pub fn encode_request(request: &Request, style: ChecksumStyle) -> Bytes {
    frame(
        &[
            request.station().as_bytes(),
            request.command().as_bytes(),
            request.data().as_bytes(),
        ],
        style,
    )
}

/// Encode a device-side response frame
///
/// # Format
///
/// ```text
/// [STX] [STATION (2)] [COMMAND (2)] [ERROR (1)] [DATA (N)] [CHECKSUM (2)] [ETX]
/// ```
#[must_use]
pub fn encode_response(station: &str, command: &str, error: ErrorCode, data: &str) -> Bytes {
    let mut code = [0u8; 4];
    let code = error.as_char().encode_utf8(&mut code);
    frame(
        &[
            station.as_bytes(),
            command.as_bytes(),
            code.as_bytes(),
            data.as_bytes(),
        ],
        ChecksumStyle::Padded,
    )
}

fn frame(fields: &[&[u8]], style: ChecksumStyle) -> Bytes {
    let len: usize = fields.iter().map(|f| f.len()).sum();
    let mut bytes = BytesMut::with_capacity(1 + len + CHECKSUM_LEN + 1);

    bytes.put_u8(STX);
    for field in fields {
        bytes.put_slice(field);
    }

    // Checksum covers STX and every field
    let checksum = render_checksum(lrc(&bytes), style);
    bytes.put_slice(checksum.as_bytes());
    bytes.put_u8(ETX);

    bytes.freeze()
}

/// Optional response checks
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Compare the trailing checksum with the frame contents
    pub verify_checksum: bool,
    /// Reject responses from any other station
    pub expect_station: Option<Station>,
}

/// Decode a response frame as read from the link
///
/// Bytes before the first STX are discarded. The device error field is
/// parsed but not interpreted; callers decide what a nonzero code means.
///
/// # Errors
///
/// Returns an error if:
/// - The frame contains non-ASCII bytes
/// - STX or ETX is missing
/// - Fewer than 5 characters remain once framing and checksum are stripped
/// - Checksum or station verification is enabled and fails
pub fn decode_response(raw: &[u8], options: &DecodeOptions) -> Result<Response> {
    if !raw.is_ascii() {
        return Err(Error::malformed("non-ASCII bytes", raw));
    }

    let Some(start) = raw.iter().position(|b| *b == STX) else {
        return Err(Error::malformed("missing STX", raw));
    };
    let Some((&ETX, body)) = raw[start + 1..].split_last() else {
        return Err(Error::malformed("missing ETX", raw));
    };

    if body.len() < MIN_RESPONSE_HEADER + CHECKSUM_LEN {
        return Err(Error::malformed("response too short", raw));
    }
    let (content, checksum) = body.split_at(body.len() - CHECKSUM_LEN);

    if options.verify_checksum {
        let expected = lrc(&raw[start..start + 1 + content.len()]);
        let found = std::str::from_utf8(checksum).unwrap_or_default();
        if u8::from_str_radix(found, 16).ok() != Some(expected) {
            return Err(Error::ChecksumMismatch {
                expected,
                found: found.to_owned(),
            });
        }
    }

    let text = std::str::from_utf8(content).map_err(|_| Error::malformed("non-ASCII bytes", raw))?;
    let (station, rest) = text.split_at(STATION_LEN);
    let (command, rest) = rest.split_at(COMMAND_LEN);
    let (error, data) = rest.split_at(ERROR_LEN);
    let error = ErrorCode::from_char(char::from(error.as_bytes()[0]));

    if let Some(expected) = options.expect_station {
        if station != expected.as_str() {
            return Err(Error::StationMismatch {
                expected: expected.to_string(),
                found: station.to_owned(),
            });
        }
    }

    Ok(Response::from_parts(station, command, error, data))
}
