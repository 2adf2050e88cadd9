//! Archive Path Layout
//!
//! Centralizes the path arithmetic for the archive directory and its
//! `inprogress/` child so the scanner, writer, and guardian never build
//! paths by hand.

use std::path::{Path, PathBuf};

use walstream_core::SegmentName;

use crate::error::{ArchiveError, Result};

/// Name of the subdirectory holding the growing segment.
pub const INPROGRESS_DIR: &str = "inprogress";

/// Suffix of a partial segment saved aside by a previous run.
pub const SAVE_SUFFIX: &str = ".save";

/// Paths of one archive directory.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    base: PathBuf,
}

impl ArchiveLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The archive directory holding completed segments.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The directory holding the growing segment and any `.save` partial.
    pub fn inprogress_dir(&self) -> PathBuf {
        self.base.join(INPROGRESS_DIR)
    }

    /// Final resting place of a completed segment.
    pub fn segment_path(&self, name: SegmentName) -> PathBuf {
        self.base.join(name.to_string())
    }

    /// Path of a segment while it is being written.
    pub fn inprogress_path(&self, name: SegmentName) -> PathBuf {
        self.inprogress_dir().join(name.to_string())
    }

    /// Path a partial segment is saved aside to at startup.
    pub fn save_path(&self, name: SegmentName) -> PathBuf {
        self.inprogress_dir().join(format!("{name}{SAVE_SUFFIX}"))
    }

    /// Create `inprogress/` if it is missing. Fails if the name exists but
    /// is occupied by something that is not a directory.
    pub async fn ensure_inprogress(&self) -> Result<()> {
        let dir = self.inprogress_dir();
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ArchiveError::NotADirectory(dir)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::create_dir(&dir).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use walstream_core::SegmentName;

    #[test]
    fn test_paths() {
        let layout = ArchiveLayout::new("/archive");
        let name = SegmentName::new(1, 0, 2);

        assert_eq!(
            layout.segment_path(name),
            PathBuf::from("/archive/000000010000000000000002")
        );
        assert_eq!(
            layout.inprogress_path(name),
            PathBuf::from("/archive/inprogress/000000010000000000000002")
        );
        assert_eq!(
            layout.save_path(name),
            PathBuf::from("/archive/inprogress/000000010000000000000002.save")
        );
    }

    #[tokio::test]
    async fn test_ensure_inprogress_creates_once() {
        let tmp = TempDir::new().unwrap();
        let layout = ArchiveLayout::new(tmp.path());

        layout.ensure_inprogress().await.unwrap();
        assert!(layout.inprogress_dir().is_dir());

        // Idempotent.
        layout.ensure_inprogress().await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_inprogress_rejects_file() {
        let tmp = TempDir::new().unwrap();
        let layout = ArchiveLayout::new(tmp.path());
        std::fs::write(layout.inprogress_dir(), b"not a dir").unwrap();

        let err = layout.ensure_inprogress().await.unwrap_err();
        assert!(matches!(err, ArchiveError::NotADirectory(_)));
    }
}
