//! Partial-Segment Guardian
//!
//! When a previous run died mid-segment, the startup scan saves the
//! partial file aside as `<name>.save` and re-requests the whole segment.
//! Until the new stream has actually re-covered those bytes, the `.save`
//! file may be the only copy of the newest transactions: if the primary
//! failed catastrophically between the two runs it cannot replay them.
//!
//! The guardian therefore retires the file at the earlier of two events:
//!
//! - the re-requested segment is published (rollover rule): the full
//!   segment now dominates the partial, or
//! - the write offset in the re-requested segment exceeds the saved size
//!   (catch-up rule, strictly greater): every byte the partial held has
//!   been re-received.

use std::path::{Path, PathBuf};

use tracing::info;

use walstream_core::SegmentName;

use crate::error::Result;

/// The partial segment a previous run left behind.
#[derive(Debug, Clone)]
pub struct SaveFile {
    path: PathBuf,
    size: u64,
    segment: SegmentName,
}

impl SaveFile {
    pub fn new(path: PathBuf, size: u64, segment: SegmentName) -> Self {
        Self {
            path,
            size,
            segment,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the partial; strictly less than a full segment.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The segment the partial belongs to (and the one the new stream
    /// re-requests first).
    pub fn segment(&self) -> SegmentName {
        self.segment
    }
}

/// Holds the `.save` file until the new stream supersedes it.
#[derive(Debug, Default)]
pub struct SaveFileGuardian {
    save: Option<SaveFile>,
}

impl SaveFileGuardian {
    /// A guardian with nothing to watch.
    pub fn new() -> Self {
        Self { save: None }
    }

    pub fn watching(save: SaveFile) -> Self {
        Self { save: Some(save) }
    }

    /// True while the `.save` file still exists.
    pub fn is_watching(&self) -> bool {
        self.save.is_some()
    }

    /// Rollover rule: the segment the partial belonged to has been
    /// published, so the partial is strictly dominated.
    pub async fn after_publish(&mut self, published: SegmentName) -> Result<()> {
        let retire = matches!(&self.save, Some(save) if save.segment == published);
        if retire {
            self.retire("segment transfer complete").await?;
        }
        Ok(())
    }

    /// Catch-up rule: while still writing the partial's segment, retire as
    /// soon as the write offset strictly exceeds the saved size.
    pub async fn after_append(&mut self, segment: SegmentName, offset: u64) -> Result<()> {
        let retire =
            matches!(&self.save, Some(save) if save.segment == segment && offset > save.size);
        if retire {
            self.retire("current transfer passed the saved point").await?;
        }
        Ok(())
    }

    async fn retire(&mut self, reason: &str) -> Result<()> {
        if let Some(save) = self.save.take() {
            info!(path = %save.path.display(), reason, "removing save file");
            tokio::fs::remove_file(&save.path).await?;
        }
        Ok(())
    }
}
