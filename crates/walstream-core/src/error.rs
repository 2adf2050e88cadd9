//! Error Types for walstream-core
//!
//! Parsing failures for the two textual forms this crate owns: segment
//! file names (24 uppercase hex chars) and WAL positions (`%X/%X`).
//! All functions in this crate return `Result<T>` aliased to
//! `Result<T, Error>` so callers can propagate with `?`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid segment file name: {0}")]
    InvalidSegmentName(String),

    #[error("Invalid WAL position: {0}")]
    InvalidPosition(String),
}
