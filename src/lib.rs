//! damper-bench: Hydraulic Damper Test Bench
//!
//! Records four-channel sample frames from the bench recorder and turns them
//! into the numbers the operator watches.
//!
//! ## Architecture
//!
//! - **Acquisition**: recorder line codec and stdin ingest
//! - **Storage**: sled-backed frame store, newest-first reads
//! - **Processing**: zero-phase Butterworth low-pass, pulse interval
//!   detection, rotation and amplitude estimation
//! - **Pipeline**: per-channel analysis, bench cycle, periodic analysis loop
//! - **Simulation**: seeded synthetic bench for tests and dry runs

pub mod acquisition;
pub mod config;
pub mod pipeline;
pub mod processing;
pub mod simulation;
pub mod storage;
pub mod types;

// Re-export bench configuration
pub use config::BenchConfig;

// Re-export commonly used types
pub use types::{
    AmplitudeSummary, AnalysisResult, BenchSnapshot, Channel, FrameMeans, Interval,
    RotationEstimate, SampleFrame, SignPolicy,
};

// Re-export errors
pub use acquisition::RecorderError;
pub use config::ConfigError;
pub use pipeline::PipelineError;
pub use processing::ProcessingError;
pub use storage::StorageError;
