//! Replication-Protocol Client Facade
//!
//! A deliberately small client for the server's frontend/backend wire
//! protocol: just enough to open a session, run a simple query, and drain
//! a copy stream. The receiver needs nothing more, and everything else
//! (pooling, prepared statements, TLS, SASL) stays out.
//!
//! ## Connection Flavors
//!
//! Both flavors start from the same caller-supplied `key=value` connection
//! string; the facade appends the database selection itself:
//!
//! - **Plain** (`dbname=postgres`): used once at startup to ask the server
//!   for its current log position when the local archive is empty.
//! - **Replication** (`dbname=replication replication=true`): used for the
//!   identify command, `START_REPLICATION`, and the long-lived copy
//!   stream.
//!
//! ## Surface
//!
//! `Connection::connect`, `query` (string tuples), `start_copy` (accepts
//! both the copy-out and copy-both entry responses), `read_frame`
//! (`CopyEvent::Data` / `CopyEvent::Done`), `finish_copy` (terminal
//! command status must be success), `close`.

pub mod codec;
pub mod conninfo;
pub mod connection;
pub mod error;

pub use codec::{BackendMessage, FrontendMessage, PgCodec};
pub use conninfo::Conninfo;
pub use connection::{Connection, CopyEvent, Mode};
pub use error::{ClientError, Result};
