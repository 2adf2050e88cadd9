//! Receiver Error Types
//!
//! The top of the error tree: configuration problems, protocol
//! violations observed in the copy stream, a failed terminal replication
//! status, and the archive/client errors bubbling up from below.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReceiverError>;

#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Replication error: {0}")]
    Replication(String),

    #[error(transparent)]
    Archive(#[from] walstream_archive::ArchiveError),

    #[error(transparent)]
    Client(#[from] walstream_client::ClientError),

    #[error(transparent)]
    Position(#[from] walstream_core::Error),
}
