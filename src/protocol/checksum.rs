//! Longitudinal redundancy check used by Port 0 frames

use super::ChecksumStyle;

/// Sum of all bytes modulo 256
#[must_use]
pub fn lrc(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Render a checksum as uppercase hex
#[must_use]
pub fn render_checksum(lrc: u8, style: ChecksumStyle) -> String {
    match style {
        ChecksumStyle::Padded => format!("{lrc:02X}"),
        ChecksumStyle::Unpadded => format!("{lrc:X}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::STX;

    #[test]
    fn test_lrc_known_frame() {
        let body = b"\x0201440CX0000";
        let expected: u32 = body.iter().map(|b| u32::from(*b)).sum::<u32>() & 0xFF;
        assert_eq!(u32::from(lrc(body)), expected);
        assert_eq!(render_checksum(lrc(body), ChecksumStyle::Padded), "56");
    }

    #[test]
    fn test_render_small_values() {
        assert_eq!(render_checksum(0x05, ChecksumStyle::Padded), "05");
        assert_eq!(render_checksum(0x05, ChecksumStyle::Unpadded), "5");
        assert_eq!(render_checksum(0xAB, ChecksumStyle::Unpadded), "AB");
    }

    #[test]
    fn test_lrc_wraps() {
        assert_eq!(lrc(&[0xFF, 0x02]), 0x01);
        assert_eq!(lrc(&[STX]), 0x02);
        assert_eq!(lrc(&[]), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the LRC is the byte sum masked to 8 bits, rendered uppercase
            #[test]
            fn prop_lrc_matches_sum(body in "[ -~]{0,64}") {
                let mut frame = vec![STX];
                frame.extend_from_slice(body.as_bytes());
                let sum: u32 = frame.iter().map(|b| u32::from(*b)).sum();
                let value = lrc(&frame);
                prop_assert_eq!(u32::from(value), sum & 0xFF);

                let rendered = render_checksum(value, ChecksumStyle::Padded);
                prop_assert_eq!(rendered.len(), 2);
                prop_assert_eq!(rendered.to_uppercase(), rendered.clone());
                prop_assert_eq!(u8::from_str_radix(&rendered, 16).unwrap(), value);
            }
        }
    }
}
