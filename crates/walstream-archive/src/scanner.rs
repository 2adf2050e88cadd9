//! Startup Archive Scan
//!
//! Decides where the replication stream must resume by looking at what the
//! previous process lifetime left on disk. Three outcomes, tried in order:
//!
//! 1. A lone partial segment in `inprogress/`: save it aside as
//!    `<name>.save` and re-request its segment from the start. The saved
//!    copy is only retired once the new stream has re-covered its bytes
//!    (see [`crate::guardian`]).
//! 2. Completed segments in the archive: resume at the start of the
//!    segment after the newest one.
//! 3. Nothing at all: the caller must ask the server for its current
//!    position.
//!
//! Anything else in `inprogress/` is refused: a `.save` file means a
//! previous recovery never resolved and a human has to look at it; more
//! than one file, a non-regular entry, or an unparseable name means the
//! directory was tampered with.

use tracing::{info, warn};

use walstream_core::{SegmentName, WalPosition};

use crate::error::{ArchiveError, Result};
use crate::guardian::SaveFile;
use crate::layout::{ArchiveLayout, SAVE_SUFFIX};

/// Outcome of the startup scan.
#[derive(Debug)]
pub enum ResumeDecision {
    /// A partial segment was saved aside; re-request its segment from the
    /// start and hand `save` to the guardian.
    ResumePartial { position: WalPosition, save: SaveFile },

    /// The archive ends with a complete segment; resume at the start of
    /// the one after it.
    ResumeAfter { position: WalPosition },

    /// Empty archive: ask the server where the log currently ends.
    NoLocalState,
}

impl ResumeDecision {
    /// The resume position, if the scan produced one. Always aligned to a
    /// segment boundary.
    pub fn position(&self) -> Option<WalPosition> {
        match self {
            ResumeDecision::ResumePartial { position, .. } => Some(*position),
            ResumeDecision::ResumeAfter { position } => Some(*position),
            ResumeDecision::NoLocalState => None,
        }
    }
}

/// One entry of `inprogress/`, classified by name shape.
enum InprogressEntry {
    Segment(SegmentName),
    Save(std::path::PathBuf),
    Unknown(String),
}

/// Inspect the archive and decide the resume position.
///
/// `inprogress/` must already exist (see [`ArchiveLayout::ensure_inprogress`]).
pub async fn resume_decision(layout: &ArchiveLayout) -> Result<ResumeDecision> {
    if let Some(entry) = scan_inprogress(layout).await? {
        return match entry {
            InprogressEntry::Save(path) => Err(ArchiveError::StaleSaveFile(path)),
            InprogressEntry::Unknown(name) => Err(ArchiveError::CorruptInprogress(format!(
                "unknown file '{name}'"
            ))),
            InprogressEntry::Segment(name) => save_partial_aside(layout, name).await,
        };
    }

    if let Some(latest) = latest_archived(layout).await? {
        let name: SegmentName = latest.parse()?;
        let position = name.next().start_position();
        info!(latest = %name, resume = %position, "resuming after newest archived segment");
        return Ok(ResumeDecision::ResumeAfter { position });
    }

    info!("nothing found in archive directory, will stream from the server's current position");
    Ok(ResumeDecision::NoLocalState)
}

/// Enumerate `inprogress/` and reduce it to at most one classified entry.
///
/// A `.save` entry wins over everything else (it is the most specific
/// diagnosis and always requires human action); otherwise any second file
/// or non-regular entry is corruption.
async fn scan_inprogress(layout: &ArchiveLayout) -> Result<Option<InprogressEntry>> {
    let dir = layout.inprogress_dir();
    let mut entries = tokio::fs::read_dir(&dir).await?;
    let mut found: Option<InprogressEntry> = None;
    let mut count = 0usize;

    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy().into_owned();

        if !entry.file_type().await?.is_file() {
            return Err(ArchiveError::CorruptInprogress(format!(
                "non-file entry '{name}'"
            )));
        }

        count += 1;
        let classified = classify(&name, layout);
        // Stale saves dominate: report them even when other debris exists.
        if found.is_none() || matches!(classified, InprogressEntry::Save(_)) {
            found = Some(classified);
        }
    }

    match found {
        Some(InprogressEntry::Save(path)) => Ok(Some(InprogressEntry::Save(path))),
        _ if count > 1 => Err(ArchiveError::CorruptInprogress(
            "more than one file".to_string(),
        )),
        other => Ok(other),
    }
}

fn classify(name: &str, layout: &ArchiveLayout) -> InprogressEntry {
    if let Ok(segment) = name.parse::<SegmentName>() {
        return InprogressEntry::Segment(segment);
    }
    if let Some(stem) = name.strip_suffix(SAVE_SUFFIX) {
        if stem.parse::<SegmentName>().is_ok() {
            return InprogressEntry::Save(layout.inprogress_dir().join(name));
        }
    }
    InprogressEntry::Unknown(name.to_string())
}

/// Rename the lone partial to `<name>.save` and record its size so the
/// guardian knows how many bytes the new stream must re-cover.
async fn save_partial_aside(layout: &ArchiveLayout, name: SegmentName) -> Result<ResumeDecision> {
    let src = layout.inprogress_path(name);
    let dest = layout.save_path(name);

    warn!(segment = %name, "partial segment found, saving aside and re-requesting");
    tokio::fs::rename(&src, &dest).await?;
    let size = tokio::fs::metadata(&dest).await?.len();

    Ok(ResumeDecision::ResumePartial {
        position: name.start_position(),
        save: SaveFile::new(dest, size, name),
    })
}

/// The lexicographically largest 24-hex name in the archive directory.
///
/// Comparison is over the raw names: fixed-width uppercase hex sorts in
/// position order by construction, and the string comparison must stay
/// case-sensitive.
async fn latest_archived(layout: &ArchiveLayout) -> Result<Option<String>> {
    let mut entries = tokio::fs::read_dir(layout.base()).await?;
    let mut latest: Option<String> = None;

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if name.parse::<SegmentName>().is_err() {
            continue;
        }
        match &latest {
            Some(best) if name.as_ref() <= best.as_str() => {}
            _ => latest = Some(name.into_owned()),
        }
    }

    Ok(latest)
}
