//! Segment Writer
//!
//! Owns the currently-growing segment file in `inprogress/` and enforces
//! the two invariants the archive depends on:
//!
//! - the on-disk size of the open segment equals the expected write offset
//!   at every frame boundary, and
//! - a segment becomes visible under its 24-hex name in the archive
//!   directory only after all of its bytes are fsynced.
//!
//! The fsync happens before the cross-directory rename: it is the
//! write-ordering fence that lets a crash-consistent reader treat every
//! published segment as whole. The archive directory itself is fsynced
//! after the rename so the new name survives a crash too.
//!
//! There is no delete path. An in-progress segment is only ever destroyed
//! by renaming it into the archive; anything left behind is recovered by
//! the next startup's scan.

use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use walstream_core::{SegmentName, TimelineId, WalPosition, SEG_SIZE};

use crate::error::{ArchiveError, Result};
use crate::layout::ArchiveLayout;

/// Writes segments into `inprogress/` and publishes them on completion.
pub struct SegmentWriter {
    layout: ArchiveLayout,
    timeline: TimelineId,
    current: Option<OpenSegment>,
}

struct OpenSegment {
    file: File,
    name: SegmentName,
    offset: u64,
}

impl SegmentWriter {
    pub fn new(layout: ArchiveLayout, timeline: TimelineId) -> Self {
        Self {
            layout,
            timeline,
            current: None,
        }
    }

    /// Name and write offset of the open segment, if any.
    pub fn current(&self) -> Option<(SegmentName, u64)> {
        self.current.as_ref().map(|seg| (seg.name, seg.offset))
    }

    /// Create the segment containing `position` in `inprogress/`.
    ///
    /// The file is created exclusively (O_CREAT|O_EXCL, mode 0600): after
    /// the startup scan the directory is empty, so an existing file under
    /// this name means the directory is being tampered with.
    pub async fn open(&mut self, position: WalPosition) -> Result<SegmentName> {
        let name = SegmentName::for_position(self.timeline, position);
        let path = self.layout.inprogress_path(name);

        info!(segment = %name, "opening segment");

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let file = options.open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                ArchiveError::NameCollision(path.clone())
            } else {
                ArchiveError::Io(e)
            }
        })?;

        self.current = Some(OpenSegment {
            file,
            name,
            offset: 0,
        });
        Ok(name)
    }

    /// Fail unless the open segment's write offset is exactly `expected`.
    /// Called for every frame that continues the current segment.
    pub fn assert_at(&self, expected: u64) -> Result<()> {
        let actual = self.current.as_ref().map(|seg| seg.offset).unwrap_or(0);
        if actual != expected {
            return Err(ArchiveError::FrameMisaligned { expected, actual });
        }
        Ok(())
    }

    /// Write all of `bytes` at the current offset and return the new
    /// offset. Short writes surface as errors.
    pub async fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        let seg = self
            .current
            .as_mut()
            .ok_or(ArchiveError::FrameMisaligned {
                expected: 0,
                actual: 0,
            })?;
        seg.file.write_all(bytes).await?;
        seg.offset += bytes.len() as u64;
        debug!(segment = %seg.name, len = bytes.len(), offset = seg.offset, "appended frame payload");
        Ok(seg.offset)
    }

    /// Publish the open segment: verify it is exactly full, fsync, close,
    /// and atomically rename it into the archive directory.
    pub async fn finalize(&mut self) -> Result<SegmentName> {
        let seg = self.current.take().ok_or(ArchiveError::ShortSegment { size: 0 })?;
        if seg.offset != SEG_SIZE {
            // Put it back so the file is left intact for the next startup.
            let size = seg.offset;
            self.current = Some(seg);
            return Err(ArchiveError::ShortSegment { size });
        }

        // fsync before rename: the ordering fence that makes every visible
        // archive segment durable.
        seg.file.sync_all().await?;
        drop(seg.file);

        let src = self.layout.inprogress_path(seg.name);
        let dest = self.layout.segment_path(seg.name);
        tokio::fs::rename(&src, &dest).await?;
        sync_dir(self.layout.base()).await?;

        info!(segment = %seg.name, "segment published to archive");
        Ok(seg.name)
    }
}

/// fsync a directory so a just-renamed entry survives a crash.
async fn sync_dir(path: &Path) -> std::io::Result<()> {
    File::open(path).await?.sync_all().await
}
