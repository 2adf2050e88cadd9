//! Segment Identity and Naming
//!
//! A segment is a fixed 16 MiB slice of the WAL and the unit of archiving.
//! Its identity is the triple `(timeline, log, seg)` where `seg` is the
//! ordinal of the slice within its 4 GiB log file. The archive file name
//! is the three fields as 8-digit uppercase hex, concatenated:
//!
//! ```text
//! 000000010000000000000002
//! └──────┘└──────┘└──────┘
//! timeline   log     seg
//! ```
//!
//! Fixed width and uppercase are load-bearing: they make lexicographic
//! name order identical to WAL position order, so the archive scanner can
//! pick the newest segment with a plain string comparison.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::position::WalPosition;

/// Segment size in bytes. A protocol compile-time constant: the sender
/// cuts its log at the same boundary.
pub const SEG_SIZE: u64 = 16 * 1024 * 1024;

/// Number of segments in one logical 4 GiB log file.
pub const SEGMENTS_PER_LOG: u32 = ((1u64 << 32) / SEG_SIZE) as u32;

/// Identifies a branch of WAL history. Captured once per session from the
/// server's identify response and constant thereafter.
pub type TimelineId = u32;

/// The identity of one archive segment.
///
/// Field order matters: the derived `Ord` compares timeline, then log,
/// then seg, which matches both position order and the lexicographic
/// order of the rendered names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentName {
    pub timeline: TimelineId,
    pub log: u32,
    pub seg: u32,
}

impl SegmentName {
    pub fn new(timeline: TimelineId, log: u32, seg: u32) -> Self {
        Self { timeline, log, seg }
    }

    /// The segment containing `position`, on the given timeline.
    pub fn for_position(timeline: TimelineId, position: WalPosition) -> Self {
        Self {
            timeline,
            log: position.log,
            seg: (position.offset as u64 / SEG_SIZE) as u32,
        }
    }

    /// WAL position of this segment's first byte.
    pub fn start_position(self) -> WalPosition {
        WalPosition::new(self.log, self.seg * SEG_SIZE as u32)
    }

    /// The segment immediately after this one, carrying into the log half
    /// when the offset would overflow 32 bits.
    pub fn next(self) -> Self {
        if self.seg + 1 >= SEGMENTS_PER_LOG {
            Self {
                timeline: self.timeline,
                log: self.log + 1,
                seg: 0,
            }
        } else {
            Self {
                timeline: self.timeline,
                log: self.log,
                seg: self.seg + 1,
            }
        }
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}{:08X}{:08X}", self.timeline, self.log, self.seg)
    }
}

impl FromStr for SegmentName {
    type Err = Error;

    /// Parse a 24-character segment name. Strict: exactly 24 chars, all
    /// uppercase hex. Mixed case is rejected, not normalized.
    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 24 || !s.bytes().all(is_upper_hex) {
            return Err(Error::InvalidSegmentName(s.to_string()));
        }
        // Slicing is safe: 24 ASCII bytes.
        let field = |range: std::ops::Range<usize>| {
            u32::from_str_radix(&s[range], 16)
                .map_err(|_| Error::InvalidSegmentName(s.to_string()))
        };
        Ok(Self {
            timeline: field(0..8)?,
            log: field(8..16)?,
            seg: field(16..24)?,
        })
    }
}

fn is_upper_hex(b: u8) -> bool {
    b.is_ascii_digit() || (b'A'..=b'F').contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fixed_width() {
        let name = SegmentName::new(1, 0, 2);
        assert_eq!(name.to_string(), "000000010000000000000002");

        let name = SegmentName::new(0xA, 0xDEADBEEF, 0xFF);
        assert_eq!(name.to_string(), "0000000ADEADBEEF000000FF");
    }

    #[test]
    fn test_parse_roundtrip() {
        for (t, l, s) in [(1, 0, 0), (1, 0, 2), (2, 0xFFFFFFFF, 0xFF), (0x7FFF, 9, 254)] {
            let name = SegmentName::new(t, l, s);
            let parsed: SegmentName = name.to_string().parse().unwrap();
            assert_eq!(parsed, name);
        }
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!("00000001000000000000000".parse::<SegmentName>().is_err());
        assert!("0000000100000000000000022".parse::<SegmentName>().is_err());
        assert!("".parse::<SegmentName>().is_err());
    }

    #[test]
    fn test_parse_rejects_mixed_case_and_nonhex() {
        assert!("000000010000000000000a02".parse::<SegmentName>().is_err());
        assert!("00000001000000000000000G".parse::<SegmentName>().is_err());
        assert!("00000001.000000000000002".parse::<SegmentName>().is_err());
    }

    #[test]
    fn test_for_position_and_start_position() {
        let pos = WalPosition::new(0, 0x2000000);
        let name = SegmentName::for_position(1, pos);
        assert_eq!(name, SegmentName::new(1, 0, 2));
        assert_eq!(name.start_position(), pos);

        // Mid-segment positions map to the same segment.
        let mid = WalPosition::new(0, 0x2ABCDEF);
        assert_eq!(SegmentName::for_position(1, mid), name);
    }

    #[test]
    fn test_next_within_log() {
        let name = SegmentName::new(1, 0, 5);
        assert_eq!(name.next(), SegmentName::new(1, 0, 6));
    }

    #[test]
    fn test_next_carries_into_log() {
        let last = SegmentName::new(1, 3, SEGMENTS_PER_LOG - 1);
        assert_eq!(last.next(), SegmentName::new(1, 4, 0));
        assert_eq!(last.next().start_position(), WalPosition::new(4, 0));
    }

    #[test]
    fn test_lexicographic_order_matches_position_order() {
        let names = [
            SegmentName::new(1, 0, 0),
            SegmentName::new(1, 0, 2),
            SegmentName::new(1, 0, 0xFF),
            SegmentName::new(1, 1, 0),
            SegmentName::new(1, 0x10, 0),
            SegmentName::new(2, 0, 0),
        ];
        for pair in names.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(
                pair[0].to_string() < pair[1].to_string(),
                "{} should sort before {}",
                pair[0],
                pair[1]
            );
            assert!(
                pair[0].start_position() <= pair[1].start_position()
                    || pair[0].timeline < pair[1].timeline
            );
        }
    }
}
