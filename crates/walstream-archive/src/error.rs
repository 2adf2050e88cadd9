//! Archive Error Types
//!
//! Every failure here is fatal to the receiver: partial state lives in the
//! filesystem and is reconstructed by the next startup's scan, so nothing
//! in this crate attempts local recovery.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Unexpected content in inprogress directory: {0}")]
    CorruptInprogress(String),

    #[error(
        "Save file {0} is left over from a previous recovery attempt; \
         inspect it manually and delete it (or use it for manual recovery) before restarting"
    )]
    StaleSaveFile(PathBuf),

    #[error("Segment file already exists: {0}")]
    NameCollision(PathBuf),

    #[error("Frame offset {expected:#X} does not match file offset {actual:#X}")]
    FrameMisaligned { expected: u64, actual: u64 },

    #[error("Segment rolled over at size {size:#X}, expected a full segment")]
    ShortSegment { size: u64 },

    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    #[error("Invalid segment name: {0}")]
    Name(#[from] walstream_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
