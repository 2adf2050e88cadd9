//! The Receive Loop
//!
//! [`Receiver::run`] is one complete session: resume-position decision,
//! identify, `START_REPLICATION`, then the frame loop until the server
//! ends the stream. All session state (timeline, open segment, guardian)
//! lives on the stack of this function and its collaborators; nothing is
//! global.
//!
//! The frame loop is a three-way state machine keyed on the frame's
//! offset within its segment:
//!
//! - no segment open: the offset must be zero (the stream starts at a
//!   segment boundary by construction), open the segment;
//! - offset zero with a segment open: rollover - the finished segment is
//!   published and the next one opened;
//! - otherwise: the offset must equal the open file's size exactly.

use tracing::{debug, info};

use walstream_archive::{
    resume_decision, ArchiveLayout, ResumeDecision, SaveFileGuardian, SegmentWriter,
};
use walstream_client::{Connection, Conninfo, CopyEvent, Mode};
use walstream_core::{TimelineId, WalPosition, SEG_SIZE};

use crate::config::ReceiverConfig;
use crate::error::{ReceiverError, Result};
use crate::frame::parse_wal_frame;

/// Drives one replication session against one archive directory.
pub struct Receiver {
    config: ReceiverConfig,
}

impl Receiver {
    pub fn new(config: ReceiverConfig) -> Self {
        Self { config }
    }

    /// Run the session to completion. Returns `Ok(())` only when the
    /// server ended the copy stream cleanly; every other outcome is an
    /// error and the archive is left for the next startup to recover.
    pub async fn run(self) -> Result<()> {
        let conninfo = self.config.validate().await?;
        let layout = ArchiveLayout::new(&self.config.archive_dir);
        layout.ensure_inprogress().await?;

        let (start, mut guardian) = resume_point(&layout, &conninfo).await?;

        let mut conn = Connection::connect(&conninfo, Mode::Replication).await?;
        let timeline = identify_timeline(&mut conn).await?;

        conn.start_copy(&format!("START_REPLICATION {start}")).await?;

        let mut writer = SegmentWriter::new(layout, timeline);
        loop {
            match conn.read_frame().await? {
                CopyEvent::Data(data) => handle_frame(&data, &mut writer, &mut guardian).await?,
                CopyEvent::Done => break,
            }
        }

        // The stream ended; a non-success terminal status means the
        // server aborted rather than shut down.
        conn.finish_copy()
            .await
            .map_err(|e| ReceiverError::Replication(e.to_string()))?;
        conn.close().await?;

        // A segment that is exactly full at clean shutdown is published;
        // a shorter one stays in inprogress/ for the next startup.
        match writer.current() {
            Some((_, offset)) if offset == SEG_SIZE => {
                let published = writer.finalize().await?;
                guardian.after_publish(published).await?;
            }
            Some((name, offset)) => {
                info!(segment = %name, size = offset, "leaving partial segment for next startup");
            }
            None => {}
        }

        info!("replication stream finished");
        Ok(())
    }
}

/// Route one copy-data payload through the segment state machine.
async fn handle_frame(
    data: &bytes::Bytes,
    writer: &mut SegmentWriter,
    guardian: &mut SaveFileGuardian,
) -> Result<()> {
    let frame = parse_wal_frame(data)?;
    let xlogoff = frame.start.seg_offset();
    debug!(start = %frame.start, len = frame.payload.len(), "received frame");

    match writer.current() {
        None => {
            if xlogoff != 0 {
                return Err(ReceiverError::ProtocolViolation(format!(
                    "received frame for offset {xlogoff:#X} with no segment open; \
                     the stream needs to start at a segment boundary"
                )));
            }
            writer.open(frame.start).await?;
        }
        Some(_) if xlogoff == 0 => {
            // Rollover: publish the finished segment, then retire the
            // save file it may have superseded, then start the next.
            let published = writer.finalize().await?;
            guardian.after_publish(published).await?;
            writer.open(frame.start).await?;
        }
        Some(_) => writer.assert_at(xlogoff)?,
    }

    let offset = writer.append(&frame.payload).await?;
    if let Some((name, _)) = writer.current() {
        guardian.after_append(name, offset).await?;
    }
    Ok(())
}

/// Decide where the stream resumes: from local state if there is any,
/// otherwise from the server's current position.
async fn resume_point(
    layout: &ArchiveLayout,
    conninfo: &Conninfo,
) -> Result<(WalPosition, SaveFileGuardian)> {
    match resume_decision(layout).await? {
        ResumeDecision::ResumePartial { position, save } => {
            Ok((position, SaveFileGuardian::watching(save)))
        }
        ResumeDecision::ResumeAfter { position } => Ok((position, SaveFileGuardian::new())),
        ResumeDecision::NoLocalState => {
            let position = current_server_position(conninfo).await?;
            Ok((position.segment_start(), SaveFileGuardian::new()))
        }
    }
}

/// One-off query on a plain connection for the server's current write
/// position. Only used when the local archive is empty.
async fn current_server_position(conninfo: &Conninfo) -> Result<WalPosition> {
    let mut conn = Connection::connect(conninfo, Mode::Plain).await?;
    let rows = conn.query("SELECT pg_current_xlog_location()").await?;
    conn.close().await?;

    let value = rows
        .first()
        .and_then(|row| row.first())
        .and_then(|field| field.as_deref())
        .ok_or_else(|| {
            ReceiverError::ProtocolViolation(
                "current xlog location query returned no rows".to_string(),
            )
        })?;
    let position: WalPosition = value.parse()?;
    info!(%position, "server's current xlog location");
    Ok(position)
}

/// `IDENTIFY_SYSTEM`: one row, system id in the first column, timeline in
/// the second. The timeline is held for the rest of the session.
async fn identify_timeline(conn: &mut Connection) -> Result<TimelineId> {
    let rows = conn.query("IDENTIFY_SYSTEM").await?;
    let row = rows.first().ok_or_else(|| {
        ReceiverError::ProtocolViolation("identify response contained no rows".to_string())
    })?;

    let system_id = row.first().and_then(|f| f.as_deref()).unwrap_or("unknown");
    let timeline = row
        .get(1)
        .and_then(|f| f.as_deref())
        .and_then(|s| s.parse::<TimelineId>().ok())
        .ok_or_else(|| {
            ReceiverError::ProtocolViolation(
                "identify response carried no usable timeline".to_string(),
            )
        })?;

    info!(system_id, timeline, "identified server");
    Ok(timeline)
}
