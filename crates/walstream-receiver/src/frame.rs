//! WAL Frame Decoding
//!
//! Every copy-data payload the receiver accepts is a WAL-data frame:
//!
//! ```text
//! +------+----------------+----------------+----------------+---------+
//! | 'w'  | start position | end position   | send time      | payload |
//! | 1 B  | 8 B            | 8 B            | 8 B            | >= 1 B  |
//! +------+----------------+----------------+----------------+---------+
//! ```
//!
//! Only the start position is consumed; the end position and send time
//! are skipped. The position travels as a `{log, offset}` pair of 32-bit
//! words in the sender's native byte order; this build decodes each half
//! little-endian, matching the platforms it is deployed against. Any
//! other tag, a short frame, or an empty payload is a protocol violation.

use bytes::Bytes;

use walstream_core::WalPosition;

use crate::error::{ReceiverError, Result};

/// Tag of a WAL-data frame.
pub const WAL_DATA_TAG: u8 = b'w';

/// Tag byte plus the three 8-byte header fields.
pub const FRAME_HEADER_SIZE: usize = 1 + 8 + 8 + 8;

/// A decoded WAL-data frame.
#[derive(Debug)]
pub struct WalFrame {
    /// WAL position of the payload's first byte.
    pub start: WalPosition,

    /// The WAL bytes themselves.
    pub payload: Bytes,
}

/// Decode one copy-data payload into a WAL frame.
pub fn parse_wal_frame(data: &Bytes) -> Result<WalFrame> {
    if data.len() < FRAME_HEADER_SIZE + 1 {
        return Err(ReceiverError::ProtocolViolation(format!(
            "copy data block of {} bytes is shorter than the required {}",
            data.len(),
            FRAME_HEADER_SIZE + 1
        )));
    }
    if data[0] != WAL_DATA_TAG {
        return Err(ReceiverError::ProtocolViolation(format!(
            "invalid copy data type '{}'",
            data[0] as char
        )));
    }

    let log = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
    let offset = u32::from_le_bytes([data[5], data[6], data[7], data[8]]);

    Ok(WalFrame {
        start: WalPosition::new(log, offset),
        payload: data.slice(FRAME_HEADER_SIZE..),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn build_frame(tag: u8, log: u32, offset: u32, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[tag]);
        buf.extend_from_slice(&log.to_le_bytes());
        buf.extend_from_slice(&offset.to_le_bytes());
        buf.extend_from_slice(&[0u8; 16]); // end position + send time, skipped
        buf.extend_from_slice(payload);
        buf.freeze()
    }

    #[test]
    fn test_parse_wal_frame() {
        let data = build_frame(b'w', 0x1, 0x2000000, b"some wal bytes");
        let frame = parse_wal_frame(&data).unwrap();
        assert_eq!(frame.start, WalPosition::new(0x1, 0x2000000));
        assert_eq!(&frame.payload[..], b"some wal bytes");
    }

    #[test]
    fn test_rejects_unknown_tag() {
        let data = build_frame(b'k', 0, 0, b"payload");
        let err = parse_wal_frame(&data).unwrap_err();
        assert!(matches!(err, ReceiverError::ProtocolViolation(_)));
    }

    #[test]
    fn test_rejects_short_frame() {
        let data = Bytes::from_static(b"w123");
        assert!(parse_wal_frame(&data).is_err());
    }

    #[test]
    fn test_rejects_empty_payload() {
        let data = build_frame(b'w', 0, 0, b"");
        assert!(parse_wal_frame(&data).is_err());
    }
}
