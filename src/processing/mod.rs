//! Signal analysis core
//!
//! Turns raw per-channel integer samples into a denoised signal, a pulse
//! count with timing, and per-cycle amplitude/noise metrics:
//!
//! - [`extract`]: frames (newest first) -> chronological channel series
//! - [`filter`]: zero-phase Butterworth low-pass
//! - [`intervals`]: threshold mask -> pulse intervals, with early stop
//! - [`rotation`]: pulse end indices -> period and RPM
//! - [`amplitude`]: envelope amplitude of signal and residual noise
//!
//! Every function here is a pure transformation of its arguments.

pub mod amplitude;
pub mod extract;
pub mod filter;
pub mod intervals;
pub mod rotation;

pub use amplitude::{analyze_amplitude, noise_percentage, window_amplitude};
pub use extract::extract_channel;
pub use filter::{lowpass_filter, lowpass_filter_truncated, LowpassFilter};
pub use intervals::{collect_intervals, detect_intervals, threshold_mask, IntervalDetector};
pub use rotation::{estimate_rotation, MIN_PULSES};

use thiserror::Error;

/// Errors in signal processing
///
/// `InvalidFilterParameter`, `InvalidSamplingRate` and `InvalidFilterOrder`
/// are configuration faults and must reach the caller. `EmptySeries` and
/// `InsufficientPulses` only mean "no result yet"; polling callers absorb
/// them into zeroed results (see [`ProcessingError::is_insufficient_data`]).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Invalid filter parameter: normalized cutoff {normalized_cutoff} must lie strictly inside (0, 1)")]
    InvalidFilterParameter { normalized_cutoff: f64 },

    #[error("Invalid sampling rate: {0}")]
    InvalidSamplingRate(f64),

    #[error("Invalid filter order {order}: supported range is 1..={max}")]
    InvalidFilterOrder { order: usize, max: usize },

    #[error("Empty series: no samples available yet")]
    EmptySeries,

    #[error("Insufficient pulses: need {needed}, found {found}")]
    InsufficientPulses { needed: usize, found: usize },
}

impl ProcessingError {
    /// True for data-sparsity conditions that should yield an empty result
    /// instead of failing the caller.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            ProcessingError::EmptySeries | ProcessingError::InsufficientPulses { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ProcessingError::EmptySeries.is_insufficient_data());
        assert!(ProcessingError::InsufficientPulses { needed: 2, found: 1 }.is_insufficient_data());
        assert!(!ProcessingError::InvalidSamplingRate(0.0).is_insufficient_data());
        assert!(!ProcessingError::InvalidFilterParameter { normalized_cutoff: 1.5 }
            .is_insufficient_data());
    }
}
