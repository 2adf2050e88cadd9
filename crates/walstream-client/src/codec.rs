//! Wire-Protocol Frame Codec
//!
//! Handles the framing of protocol version 3.0 messages.
//!
//! Backend frame format:
//! ```text
//! +-----+-------------------+------------------+
//! | Tag | Length (4 bytes)  | Body             |
//! +-----+-------------------+------------------+
//! ```
//! The length is big-endian and counts itself but not the tag.
//!
//! The startup message is the one frontend frame without a tag byte; the
//! encoder special-cases it.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ClientError, Result};

/// Protocol version 3.0.
const PROTOCOL_VERSION: i32 = 196608;

/// Maximum frame size (64MB). Copy-data frames carry at most a segment's
/// worth of payload, so anything larger is a corrupt length.
const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Backend message tags the facade understands.
pub mod tags {
    pub const AUTHENTICATION: u8 = b'R';
    pub const BACKEND_KEY_DATA: u8 = b'K';
    pub const PARAMETER_STATUS: u8 = b'S';
    pub const READY_FOR_QUERY: u8 = b'Z';
    pub const ERROR_RESPONSE: u8 = b'E';
    pub const NOTICE_RESPONSE: u8 = b'N';
    pub const ROW_DESCRIPTION: u8 = b'T';
    pub const DATA_ROW: u8 = b'D';
    pub const COMMAND_COMPLETE: u8 = b'C';
    pub const EMPTY_QUERY_RESPONSE: u8 = b'I';
    pub const COPY_OUT_RESPONSE: u8 = b'H';
    pub const COPY_BOTH_RESPONSE: u8 = b'W';
    pub const COPY_DATA: u8 = b'd';
    pub const COPY_DONE: u8 = b'c';
}

/// A decoded backend message: tag plus raw body.
#[derive(Debug)]
pub struct BackendMessage {
    pub tag: u8,
    pub body: BytesMut,
}

/// Frontend messages the facade sends.
#[derive(Debug)]
pub enum FrontendMessage {
    /// Session start: protocol version plus `key\0value\0` parameter pairs.
    Startup(Vec<(String, String)>),
    /// Cleartext password response.
    Password(String),
    /// Simple query (also carries replication commands).
    Query(String),
    /// Session termination.
    Terminate,
}

/// Codec for protocol frames over a byte stream.
#[derive(Debug, Default)]
pub struct PgCodec {}

impl PgCodec {
    pub fn new() -> Self {
        Self {}
    }
}

impl Decoder for PgCodec {
    type Item = BackendMessage;
    type Error = ClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        // Tag byte plus the length field.
        if src.len() < 5 {
            return Ok(None);
        }

        let tag = src[0];
        let length = (&src[1..5]).get_i32();
        if length < 4 {
            return Err(ClientError::Protocol(format!(
                "frame length {} below minimum",
                length
            )));
        }
        let length = length as usize;
        if length > MAX_FRAME_SIZE {
            return Err(ClientError::Protocol(format!(
                "frame size {} exceeds maximum {}",
                length, MAX_FRAME_SIZE
            )));
        }

        let total = 1 + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(5);
        let body = src.split_to(length - 4);
        Ok(Some(BackendMessage { tag, body }))
    }
}

impl Encoder<FrontendMessage> for PgCodec {
    type Error = ClientError;

    fn encode(&mut self, item: FrontendMessage, dst: &mut BytesMut) -> Result<()> {
        match item {
            FrontendMessage::Startup(params) => {
                let mut body = BytesMut::new();
                body.put_i32(PROTOCOL_VERSION);
                for (key, value) in &params {
                    put_cstr(&mut body, key);
                    put_cstr(&mut body, value);
                }
                body.put_u8(0);

                dst.reserve(4 + body.len());
                dst.put_i32(4 + body.len() as i32);
                dst.extend_from_slice(&body);
            }
            FrontendMessage::Password(password) => {
                put_tagged(dst, b'p', |body| put_cstr(body, &password));
            }
            FrontendMessage::Query(sql) => {
                put_tagged(dst, b'Q', |body| put_cstr(body, &sql));
            }
            FrontendMessage::Terminate => {
                put_tagged(dst, b'X', |_| {});
            }
        }
        Ok(())
    }
}

fn put_tagged(dst: &mut BytesMut, tag: u8, fill: impl FnOnce(&mut BytesMut)) {
    let mut body = BytesMut::new();
    fill(&mut body);
    dst.reserve(5 + body.len());
    dst.put_u8(tag);
    dst.put_i32(4 + body.len() as i32);
    dst.extend_from_slice(&body);
}

fn put_cstr(dst: &mut BytesMut, s: &str) {
    dst.extend_from_slice(s.as_bytes());
    dst.put_u8(0);
}

/// Read a NUL-terminated string from a message body.
pub fn get_cstr(buf: &mut BytesMut) -> Result<String> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| ClientError::Protocol("unterminated string in message".to_string()))?;
    let bytes = buf.split_to(end);
    buf.advance(1);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ClientError::Protocol(format!("invalid UTF-8 in message: {}", e)))
}

/// Parse an error or notice body (`code byte` + string, repeated, then a
/// terminating NUL) into its severity and message fields.
pub fn parse_error_fields(mut body: BytesMut) -> (String, String) {
    let mut severity = String::from("ERROR");
    let mut message = String::from("unknown error");
    while !body.is_empty() {
        let code = body.get_u8();
        if code == 0 {
            break;
        }
        match get_cstr(&mut body) {
            Ok(value) => match code {
                b'S' => severity = value,
                b'M' => message = value,
                _ => {}
            },
            Err(_) => break,
        }
    }
    (severity, message)
}
