//! Client Error Types
//!
//! Connection setup, protocol decode, and server-reported failures. All
//! fatal: the receiver never retries inside a session.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unsupported authentication request (code {0}); only trust and cleartext password are supported")]
    UnsupportedAuth(i32),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server error: {severity}: {message}")]
    Server { severity: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
