//! The walstream Receive Loop
//!
//! This crate drives a replication session end to end: decide the resume
//! position from the archive, identify the server, issue
//! `START_REPLICATION`, and route every WAL frame into the segment writer
//! until the server closes the stream.
//!
//! ## Control Flow
//!
//! ```text
//! archive scan ──► resume position
//!                      │
//!                      ▼
//!        (empty archive: ask the server)
//!                      │
//!                      ▼
//! replication session: IDENTIFY_SYSTEM ──► START_REPLICATION
//!                      │
//!                      ▼
//!            ┌── read frame ◄───────────────┐
//!            │        │                     │
//!            │   segment writer (open /     │
//!            │   rollover / aligned append) │
//!            │        │                     │
//!            │   save-file guardian         │
//!            └────────┴─────────────────────┘
//! ```
//!
//! One cooperative task, one connection, one open file. Every error is
//! fatal; recovery is the next startup's archive scan.

pub mod config;
pub mod error;
pub mod frame;
pub mod receiver;

pub use config::ReceiverConfig;
pub use error::{ReceiverError, Result};
pub use receiver::Receiver;
