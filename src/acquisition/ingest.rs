//! Recorder ingest loop
//!
//! Reads recorder lines from any async line source (normally the recorder
//! process's stdout piped into our stdin), parses them and appends accepted
//! frames to the frame store.

use chrono::NaiveDate;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use super::recorder::{parse_line, SequenceGate};
use crate::storage::{FrameStore, StorageError};

/// Counters for one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordStats {
    pub lines_read: u64,
    pub frames_stored: u64,
    /// Lines that were not frames (status chatter).
    pub lines_skipped: u64,
    /// Frames dropped because their counter was not newer than the last one stored.
    pub frames_repeated: u64,
    pub parse_errors: u64,
}

/// Ingest recorder lines until EOF or cancellation.
///
/// Malformed lines are counted and logged, never fatal. Storage failures
/// abort the run.
pub async fn record_stream<R>(
    mut reader: R,
    store: &FrameStore,
    table: &str,
    date: NaiveDate,
    frame_size: Option<usize>,
    cancel: CancellationToken,
) -> Result<RecordStats, StorageError>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = RecordStats::default();
    let mut gate = SequenceGate::new();
    let mut line = String::with_capacity(64 * 1024);

    loop {
        line.clear();
        let read = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Recording cancelled");
                break;
            }
            read = reader.read_line(&mut line) => read,
        };

        match read {
            Ok(0) => {
                tracing::info!("Recorder stream ended");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read recorder line, stopping");
                break;
            }
        }
        stats.lines_read += 1;

        match parse_line(&line, date, frame_size) {
            Ok(Some(frame)) => {
                if !gate.accept(frame.sequence_number) {
                    stats.frames_repeated += 1;
                    tracing::debug!(
                        sequence = frame.sequence_number,
                        last = ?gate.last_accepted(),
                        "Dropping repeated frame"
                    );
                    continue;
                }
                store.append_frame(table, &frame)?;
                stats.frames_stored += 1;
            }
            Ok(None) => {
                stats.lines_skipped += 1;
                tracing::trace!(line = line.trim_end(), "Skipping non-frame line");
            }
            Err(e) => {
                stats.parse_errors += 1;
                tracing::warn!(line_no = stats.lines_read, error = %e, "Malformed recorder line");
            }
        }
    }

    store.flush()?;
    tracing::info!(
        stored = stats.frames_stored,
        skipped = stats.lines_skipped,
        repeated = stats.frames_repeated,
        errors = stats.parse_errors,
        "Recording finished"
    );
    Ok(stats)
}
