//! Session Management
//!
//! One `Connection` is one session: TCP connect, startup handshake,
//! then either a handful of simple queries (plain mode) or the identify /
//! start-replication / copy-stream sequence (replication mode).
//!
//! The session-level message flow lives here; the byte-level framing is
//! in [`crate::codec`].

use bytes::{Buf, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info};

use crate::codec::{parse_error_fields, tags, BackendMessage, FrontendMessage, PgCodec};
use crate::conninfo::Conninfo;
use crate::error::{ClientError, Result};

/// Which database the session is opened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `dbname=postgres`: ordinary SQL session for one-off queries.
    Plain,
    /// `dbname=replication replication=true`: replication command session.
    Replication,
}

/// One event read from an active copy stream.
#[derive(Debug)]
pub enum CopyEvent {
    /// A copy-data frame's payload.
    Data(Bytes),
    /// The server ended the stream; call
    /// [`Connection::finish_copy`] to check the terminal status.
    Done,
}

/// A live session with the server.
pub struct Connection {
    framed: Framed<TcpStream, PgCodec>,
}

impl Connection {
    /// Connect, run the startup handshake, and authenticate.
    pub async fn connect(conninfo: &Conninfo, mode: Mode) -> Result<Self> {
        let stream = TcpStream::connect((conninfo.host(), conninfo.port()))
            .await
            .map_err(|e| {
                ClientError::Connection(format!("failed to connect to {conninfo}: {e}"))
            })?;

        info!(target = %conninfo, ?mode, "connected, starting session");

        let mut params = vec![("user".to_string(), conninfo.user().to_string())];
        match mode {
            Mode::Plain => params.push(("database".to_string(), "postgres".to_string())),
            Mode::Replication => {
                params.push(("database".to_string(), "replication".to_string()));
                params.push(("replication".to_string(), "true".to_string()));
            }
        }

        let mut connection = Self {
            framed: Framed::new(stream, PgCodec::new()),
        };
        connection.send(FrontendMessage::Startup(params)).await?;
        connection.authenticate(conninfo.password()).await?;
        Ok(connection)
    }

    /// Run a simple query and collect every row as text fields.
    pub async fn query(&mut self, sql: &str) -> Result<Vec<Vec<Option<String>>>> {
        debug!(sql, "running query");
        self.send(FrontendMessage::Query(sql.to_string())).await?;

        let mut rows = Vec::new();
        loop {
            let msg = self.receive().await?;
            match msg.tag {
                tags::ROW_DESCRIPTION | tags::COMMAND_COMPLETE | tags::EMPTY_QUERY_RESPONSE => {}
                tags::DATA_ROW => rows.push(parse_data_row(msg.body)?),
                tags::READY_FOR_QUERY => return Ok(rows),
                tags::NOTICE_RESPONSE => {}
                tags::ERROR_RESPONSE => return Err(server_error(msg.body)),
                other => return Err(unexpected(other, "query response")),
            }
        }
    }

    /// Issue a command that puts the session into copy mode. Both the
    /// copy-out and copy-both entry responses are accepted (older servers
    /// send the former, newer ones the latter).
    pub async fn start_copy(&mut self, command: &str) -> Result<()> {
        info!(command, "entering copy mode");
        self.send(FrontendMessage::Query(command.to_string())).await?;

        loop {
            let msg = self.receive().await?;
            match msg.tag {
                tags::COPY_OUT_RESPONSE | tags::COPY_BOTH_RESPONSE => return Ok(()),
                tags::NOTICE_RESPONSE => {}
                tags::ERROR_RESPONSE => return Err(server_error(msg.body)),
                other => return Err(unexpected(other, "copy mode entry")),
            }
        }
    }

    /// Read the next event from the copy stream.
    pub async fn read_frame(&mut self) -> Result<CopyEvent> {
        loop {
            let msg = self.receive().await?;
            match msg.tag {
                tags::COPY_DATA => return Ok(CopyEvent::Data(msg.body.freeze())),
                tags::COPY_DONE => return Ok(CopyEvent::Done),
                tags::NOTICE_RESPONSE => {}
                tags::ERROR_RESPONSE => return Err(server_error(msg.body)),
                other => return Err(unexpected(other, "copy stream")),
            }
        }
    }

    /// After [`CopyEvent::Done`]: the stream ended; the terminal command
    /// status must be success for a clean shutdown.
    pub async fn finish_copy(&mut self) -> Result<()> {
        loop {
            let msg = self.receive().await?;
            match msg.tag {
                tags::COMMAND_COMPLETE | tags::NOTICE_RESPONSE => {}
                tags::READY_FOR_QUERY => return Ok(()),
                tags::ERROR_RESPONSE => return Err(server_error(msg.body)),
                other => return Err(unexpected(other, "copy stream end")),
            }
        }
    }

    /// Send the termination message and drop the session.
    pub async fn close(mut self) -> Result<()> {
        self.send(FrontendMessage::Terminate).await?;
        Ok(())
    }

    /// Drive the post-startup authentication exchange until the server is
    /// ready for queries.
    async fn authenticate(&mut self, password: Option<&str>) -> Result<()> {
        loop {
            let msg = self.receive().await?;
            match msg.tag {
                tags::AUTHENTICATION => {
                    let mut body = msg.body;
                    if body.len() < 4 {
                        return Err(ClientError::Protocol(
                            "authentication message too short".to_string(),
                        ));
                    }
                    match body.get_i32() {
                        0 => {}
                        3 => {
                            let password = password.ok_or_else(|| {
                                ClientError::Connection(
                                    "server requested a password but none was supplied"
                                        .to_string(),
                                )
                            })?;
                            self.send(FrontendMessage::Password(password.to_string()))
                                .await?;
                        }
                        other => return Err(ClientError::UnsupportedAuth(other)),
                    }
                }
                tags::PARAMETER_STATUS | tags::BACKEND_KEY_DATA | tags::NOTICE_RESPONSE => {}
                tags::READY_FOR_QUERY => return Ok(()),
                tags::ERROR_RESPONSE => return Err(server_error(msg.body)),
                other => return Err(unexpected(other, "session startup")),
            }
        }
    }

    async fn send(&mut self, msg: FrontendMessage) -> Result<()> {
        self.framed.send(msg).await
    }

    async fn receive(&mut self) -> Result<BackendMessage> {
        match self.framed.next().await {
            Some(msg) => msg,
            None => Err(ClientError::Connection(
                "connection closed unexpectedly".to_string(),
            )),
        }
    }
}

fn parse_data_row(mut body: BytesMut) -> Result<Vec<Option<String>>> {
    if body.len() < 2 {
        return Err(ClientError::Protocol("data row too short".to_string()));
    }
    let count = body.get_i16();
    let mut fields = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        if body.len() < 4 {
            return Err(ClientError::Protocol("truncated data row".to_string()));
        }
        let len = body.get_i32();
        if len < 0 {
            fields.push(None);
            continue;
        }
        let len = len as usize;
        if body.len() < len {
            return Err(ClientError::Protocol("truncated data row field".to_string()));
        }
        let bytes = body.split_to(len);
        let value = String::from_utf8(bytes.to_vec())
            .map_err(|e| ClientError::Protocol(format!("invalid UTF-8 in data row: {e}")))?;
        fields.push(Some(value));
    }
    Ok(fields)
}

fn server_error(body: BytesMut) -> ClientError {
    let (severity, message) = parse_error_fields(body);
    ClientError::Server { severity, message }
}

fn unexpected(tag: u8, context: &str) -> ClientError {
    ClientError::Protocol(format!(
        "unexpected message '{}' during {context}",
        tag as char
    ))
}
