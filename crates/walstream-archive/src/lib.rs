//! Archive Directory Management
//!
//! This crate owns everything walstream does to the local filesystem. The
//! archive directory *is* the receiver's persistent state:
//!
//! ```text
//! base/                          completed segments, 24-hex names, 16 MiB each
//! base/inprogress/               the one growing segment
//! base/inprogress/<name>.save    at most one partial saved by a prior run
//! ```
//!
//! ## Main Components
//!
//! ### ArchiveLayout
//! Path arithmetic for the two directories, plus `inprogress/` creation.
//!
//! ### Scanner
//! Inspects the layout at startup and decides where the stream must
//! resume: re-request a partial segment, continue after the newest
//! complete one, or report that there is no local state at all.
//!
//! ### SegmentWriter
//! Owns the currently-growing file. Enforces the write-position invariant
//! on every append and publishes completed segments with fsync + atomic
//! rename, so a crash can never leave a short file under a 24-hex name in
//! the archive directory.
//!
//! ### SaveFileGuardian
//! Tracks the `.save` partial from a previous run and deletes it only
//! once the new stream has durably re-covered its bytes.

pub mod error;
pub mod guardian;
pub mod layout;
pub mod scanner;
pub mod writer;

pub use error::{ArchiveError, Result};
pub use guardian::{SaveFile, SaveFileGuardian};
pub use layout::ArchiveLayout;
pub use scanner::{resume_decision, ResumeDecision};
pub use writer::SegmentWriter;
