//! Frame Storage
//!
//! Persists recorded frames to Sled DB. One tree per table identifier;
//! keys are ids from `Db::generate_id()` as big-endian bytes, so iteration
//! order is insertion order and `iter().rev()` walks newest first.
//!
//! Every appended frame also leaves its per-channel means in a companion
//! `<table>_means` tree under the same key.

use std::path::Path;

use sled::{Db, Tree};
use thiserror::Error;

use crate::types::{FrameMeans, SampleFrame};

/// Error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Read side of frame storage, as the analysis pipeline sees it.
pub trait FrameSource {
    /// Up to `count` most recent frames of `table`, newest first.
    fn fetch_recent_frames(&self, table: &str, count: usize) -> Result<Vec<SampleFrame>, StorageError>;
}

/// Caller-held position for incremental reads.
///
/// Tracks the newest storage id already handed out, so repeated polls only
/// return frames appended since the previous poll. Storage ids keep growing
/// across `clear_table` and recorder restarts, so a counter that starts over
/// at 1 is still seen as new.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCursor {
    last_id: Option<u64>,
    last_seen: Option<u64>,
}

impl FrameCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder counter of the newest frame handed out.
    pub fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }

    fn is_new(&self, id: u64) -> bool {
        self.last_id.map_or(true, |last| id > last)
    }
}

/// Sled-backed frame store.
#[derive(Clone)]
pub struct FrameStore {
    db: Db,
}

impl FrameStore {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        tracing::info!("Frame storage opened at {:?}", path_ref);
        Ok(Self { db })
    }

    fn frames(&self, table: &str) -> Result<Tree, StorageError> {
        Ok(self.db.open_tree(table)?)
    }

    fn means(&self, table: &str) -> Result<Tree, StorageError> {
        Ok(self.db.open_tree(format!("{table}_means"))?)
    }

    /// Append a frame and its channel means. Returns the storage id.
    ///
    /// Does not flush; sled flushes in the background. Call [`flush`](Self::flush)
    /// when durability matters (e.g. on shutdown).
    pub fn append_frame(&self, table: &str, frame: &SampleFrame) -> Result<u64, StorageError> {
        let id = self.db.generate_id()?;
        let key = id.to_be_bytes();

        self.frames(table)?.insert(key, serde_json::to_vec(frame)?)?;
        self.means(table)?
            .insert(key, serde_json::to_vec(&frame.channel_means())?)?;

        tracing::debug!(
            table,
            id,
            sequence = frame.sequence_number,
            samples = frame.frame_size(),
            "Stored frame"
        );
        Ok(id)
    }

    /// Up to `count` most recent frames, newest first.
    ///
    /// Undecodable records are skipped with a warning.
    pub fn recent_frames(&self, table: &str, count: usize) -> Result<Vec<SampleFrame>, StorageError> {
        Ok(recent_values(&self.frames(table)?, count, table))
    }

    /// Frames appended since `cursor` last moved, newest first, at most
    /// `count` of them. The cursor advances to the newest frame returned.
    pub fn fetch_new_frames(
        &self,
        table: &str,
        count: usize,
        cursor: &mut FrameCursor,
    ) -> Result<Vec<SampleFrame>, StorageError> {
        let mut frames = Vec::new();
        let mut newest: Option<(u64, u64)> = None;

        for item in self.frames(table)?.iter().rev() {
            if frames.len() >= count {
                break;
            }
            let (key, value) = match item {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(table, error = %e, "Skipping unreadable record");
                    continue;
                }
            };
            let Some(id) = decode_id(&key) else {
                tracing::warn!(table, key_len = key.len(), "Skipping record with malformed key");
                continue;
            };
            if !cursor.is_new(id) {
                break;
            }
            match serde_json::from_slice::<SampleFrame>(&value) {
                Ok(frame) => {
                    newest.get_or_insert((id, frame.sequence_number));
                    frames.push(frame);
                }
                Err(e) => tracing::warn!(table, error = %e, "Skipping undecodable record"),
            }
        }

        if let Some((id, sequence)) = newest {
            cursor.last_id = Some(id);
            cursor.last_seen = Some(sequence);
        }
        tracing::debug!(table, new = frames.len(), last_seen = ?cursor.last_seen(), "Incremental frame read");
        Ok(frames)
    }

    /// Up to `count` most recent per-frame channel means, newest first.
    pub fn recent_means(&self, table: &str, count: usize) -> Result<Vec<FrameMeans>, StorageError> {
        Ok(recent_values(&self.means(table)?, count, table))
    }

    /// Number of frames stored in `table`.
    pub fn frame_count(&self, table: &str) -> Result<usize, StorageError> {
        Ok(self.frames(table)?.len())
    }

    /// Remove every frame (and mean) from `table`.
    pub fn clear_table(&self, table: &str) -> Result<(), StorageError> {
        self.frames(table)?.clear()?;
        self.means(table)?.clear()?;
        self.db.flush()?;
        tracing::info!(table, "Frame table cleared");
        Ok(())
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl FrameSource for FrameStore {
    fn fetch_recent_frames(&self, table: &str, count: usize) -> Result<Vec<SampleFrame>, StorageError> {
        self.recent_frames(table, count)
    }
}

fn decode_id(key: &[u8]) -> Option<u64> {
    <[u8; 8]>::try_from(key).ok().map(u64::from_be_bytes)
}

fn recent_values<T: serde::de::DeserializeOwned>(tree: &Tree, count: usize, table: &str) -> Vec<T> {
    let mut out = Vec::with_capacity(count.min(tree.len()));
    for item in tree.iter().rev() {
        if out.len() >= count {
            break;
        }
        match item {
            Ok((_key, value)) => match serde_json::from_slice::<T>(&value) {
                Ok(v) => out.push(v),
                Err(e) => tracing::warn!(table, error = %e, "Skipping undecodable record"),
            },
            Err(e) => tracing::warn!(table, error = %e, "Skipping unreadable record"),
        }
    }
    out
}
