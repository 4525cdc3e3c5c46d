//! System-wide default constants.
//!
//! Centralises the bench constants used as configuration defaults.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Acquisition
// ============================================================================

/// Samples per channel in one recorded frame.
pub const FRAME_SIZE: usize = 2048;

/// Frames pulled from storage for one analysis tick.
pub const FRAMES_PER_ANALYSIS: usize = 50;

/// Bench sampling rate (Hz). 1 024 samples per frame-period x 50.
pub const SAMPLING_RATE_HZ: f64 = 1024.0 * 50.0;

/// Storage table the recorder writes frames into.
pub const FRAME_TABLE: &str = "data_records";

// ============================================================================
// Filter
// ============================================================================

/// Butterworth order.
pub const FILTER_ORDER: usize = 5;

/// Expected fundamental of the damper stroke (Hz).
pub const FUNDAMENTAL_HZ: f64 = 5.0 * 50.0;

/// Low-pass cutoff as a multiple of the fundamental.
pub const CUTOFF_MULTIPLIER: f64 = 2.0;

// ============================================================================
// Rotation
// ============================================================================

/// Tachometer pulse threshold (raw counts).
pub const ROTATION_THRESHOLD: i32 = 5000;

/// Pulses collected before the scan stops.
pub const ROTATION_MIN_PULSES: usize = 6;

// ============================================================================
// Channels
// ============================================================================

pub const FORCE_CHANNEL: i64 = 1;
pub const DISPLACEMENT_CHANNEL: i64 = 2;
pub const TEMPERATURE_CHANNEL: i64 = 3;
pub const ROTATION_CHANNEL: i64 = 4;

// ============================================================================
// Runtime
// ============================================================================

/// Analysis polling interval (ms), one dashboard refresh.
pub const POLL_INTERVAL_MS: u64 = 500;

/// Default sled database location.
pub const STORAGE_PATH: &str = "./data/bench.db";
