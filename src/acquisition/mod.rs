//! Frame acquisition
//!
//! Handles data ingestion from the bench recorder.

pub mod ingest;
pub mod recorder;

pub use ingest::{record_stream, RecordStats};
pub use recorder::{format_line, parse_line, RecorderError, SequenceGate};
