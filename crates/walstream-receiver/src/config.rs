//! Receiver Configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use walstream_client::Conninfo;

use crate::error::{ReceiverError, Result};

/// Everything a receiver session needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// `key=value` connection string: server and credentials, never a
    /// database (the connection mode selects that).
    pub conninfo: String,

    /// Archive directory. Must already exist; the `inprogress/`
    /// subdirectory is created on demand.
    pub archive_dir: PathBuf,
}

impl ReceiverConfig {
    /// Check the configuration before opening any connection: the
    /// conninfo must parse (and must not name a database), and the
    /// archive directory must exist.
    pub async fn validate(&self) -> Result<Conninfo> {
        let conninfo =
            Conninfo::parse(&self.conninfo).map_err(|e| ReceiverError::Config(e.to_string()))?;

        match tokio::fs::metadata(&self.archive_dir).await {
            Ok(meta) if meta.is_dir() => Ok(conninfo),
            Ok(_) => Err(ReceiverError::Config(format!(
                "archive path {} is not a directory",
                self.archive_dir.display()
            ))),
            Err(_) => Err(ReceiverError::Config(format!(
                "archive directory {} does not exist",
                self.archive_dir.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_validate_ok() {
        let tmp = TempDir::new().unwrap();
        let config = ReceiverConfig {
            conninfo: "host=db1 user=rep".to_string(),
            archive_dir: tmp.path().to_path_buf(),
        };
        let conninfo = config.validate().await.unwrap();
        assert_eq!(conninfo.host(), "db1");
    }

    #[tokio::test]
    async fn test_validate_rejects_dbname() {
        let tmp = TempDir::new().unwrap();
        let config = ReceiverConfig {
            conninfo: "user=rep dbname=postgres".to_string(),
            archive_dir: tmp.path().to_path_buf(),
        };
        assert!(matches!(
            config.validate().await,
            Err(ReceiverError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_missing_directory() {
        let config = ReceiverConfig {
            conninfo: "user=rep".to_string(),
            archive_dir: PathBuf::from("/definitely/not/here"),
        };
        assert!(matches!(
            config.validate().await,
            Err(ReceiverError::Config(_))
        ));
    }
}
