//! Persistent storage
//!
//! Recorded frames live in a Sled DB, one tree per bench table.

pub mod frames;

pub use frames::{FrameCursor, FrameSource, FrameStore, StorageError};
