//! Core Types for walstream
//!
//! This crate defines the pure data types shared by every walstream crate:
//! WAL positions, segment identities, and the arithmetic between them.
//! There is no I/O here - everything is total functions over integers and
//! fixed-width hex strings.
//!
//! ## The Coordinate System
//!
//! The write-ahead log is a single 64-bit byte address space. On the wire
//! and in command strings a position is rendered as two uppercase hex
//! halves separated by `/` (e.g. `1/2000000`): the upper 32 bits select a
//! logical 4 GiB "log file", the lower 32 bits are the byte offset inside
//! it. For archiving, each log file is cut into fixed 16 MiB segments.
//!
//! A segment's identity is `(timeline, log, seg)`, rendered as a 24-char
//! uppercase hex file name of three 8-digit fields. Fixed-width uppercase
//! hex means the names sort lexicographically in position order, which the
//! archive scanner relies on.

pub mod error;
pub mod position;
pub mod segment;

pub use error::{Error, Result};
pub use position::WalPosition;
pub use segment::{SegmentName, TimelineId, SEGMENTS_PER_LOG, SEG_SIZE};
