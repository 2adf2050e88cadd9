//! Connection String Parsing
//!
//! The caller supplies server location and credentials as `key=value`
//! pairs (`host=10.0.0.5 port=5433 user=rep password=s3cret`). The
//! database is never part of it: the facade appends the right `dbname`
//! (and `replication=true`) for each connection flavor itself.

use std::fmt;

use crate::error::{ClientError, Result};

/// Parsed connection parameters.
#[derive(Debug, Clone)]
pub struct Conninfo {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
}

impl Conninfo {
    /// Parse a whitespace-separated `key=value` connection string.
    ///
    /// Recognized keys: `host` (default `localhost`), `port` (default
    /// `5432`), `user` (required), `password`. A `dbname` key is rejected:
    /// the connection flavor decides the database. Unknown keys are
    /// rejected rather than silently dropped.
    pub fn parse(s: &str) -> Result<Self> {
        let mut host = "localhost".to_string();
        let mut port = 5432u16;
        let mut user = None;
        let mut password = None;

        for pair in s.split_whitespace() {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                ClientError::Connection(format!("malformed conninfo entry '{pair}'"))
            })?;
            match key {
                "host" => host = value.to_string(),
                "port" => {
                    port = value.parse().map_err(|_| {
                        ClientError::Connection(format!("invalid port '{value}'"))
                    })?;
                }
                "user" => user = Some(value.to_string()),
                "password" => password = Some(value.to_string()),
                "dbname" => {
                    return Err(ClientError::Connection(
                        "conninfo must not specify dbname; the connection mode selects it"
                            .to_string(),
                    ));
                }
                other => {
                    return Err(ClientError::Connection(format!(
                        "unsupported conninfo parameter '{other}'"
                    )));
                }
            }
        }

        let user = user.ok_or_else(|| {
            ClientError::Connection("conninfo must name a user".to_string())
        })?;

        Ok(Self {
            host,
            port,
            user,
            password,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

/// Renders without the password, for logs.
impl fmt::Display for Conninfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host={} port={} user={}", self.host, self.port, self.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let info = Conninfo::parse("host=db1 port=5433 user=rep password=secret").unwrap();
        assert_eq!(info.host(), "db1");
        assert_eq!(info.port(), 5433);
        assert_eq!(info.user(), "rep");
        assert_eq!(info.password(), Some("secret"));
    }

    #[test]
    fn test_parse_defaults() {
        let info = Conninfo::parse("user=rep").unwrap();
        assert_eq!(info.host(), "localhost");
        assert_eq!(info.port(), 5432);
        assert_eq!(info.password(), None);
    }

    #[test]
    fn test_parse_requires_user() {
        assert!(Conninfo::parse("host=db1").is_err());
    }

    #[test]
    fn test_parse_rejects_dbname() {
        assert!(Conninfo::parse("user=rep dbname=postgres").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_and_malformed() {
        assert!(Conninfo::parse("user=rep sslmode=disable").is_err());
        assert!(Conninfo::parse("user=rep port=not-a-number").is_err());
        assert!(Conninfo::parse("user").is_err());
    }

    #[test]
    fn test_display_omits_password() {
        let info = Conninfo::parse("user=rep password=secret").unwrap();
        assert!(!info.to_string().contains("secret"));
    }
}
