//! Analysis Pipeline Module
//!
//! ```text
//! frames (newest first)
//!   -> extract channel (chronological)
//!   -> zero-phase low-pass          -> filtered, noise = raw - filtered
//!   -> threshold + pulse intervals  -> rotation estimate (end indices, RPM)
//!   -> amplitude per revolution     -> main / noise amplitude, noise %
//! ```
//!
//! [`channel`] composes the processing stages for a single channel,
//! [`bench`] runs a full dashboard tick across the bench's channels and
//! [`analysis_loop`] repeats that tick against the frame store.

pub mod analysis_loop;
pub mod bench;
pub mod channel;

pub use analysis_loop::{AnalysisLoop, LoopStats};
pub use bench::{analyze_bench_cycle, BenchAnalyzer};
pub use channel::{analyze_channel, analyze_series, count_rotations};

use thiserror::Error;

use crate::processing::ProcessingError;
use crate::storage::StorageError;

/// Errors surfaced by a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
