//! Rotation speed from pulse timing
//!
//! One pulse per revolution. The trailing edge (`end`) of each pulse is the
//! timing mark: it is the steadier edge for the bench's tachometer waveform.

use crate::types::{Interval, RotationEstimate};

/// Fewer pulses than this cannot define a period.
pub const MIN_PULSES: usize = 2;

/// Estimate pulse period and RPM from detected intervals.
///
/// Fewer than two intervals is not an error: the bench may simply be idle.
/// A zeroed estimate is returned and the condition is logged at debug level.
/// A non-positive sampling rate yields period 0 and RPM 0.
pub fn estimate_rotation(intervals: &[Interval], sampling_rate_hz: f64) -> RotationEstimate {
    if intervals.len() < MIN_PULSES {
        tracing::debug!(
            found = intervals.len(),
            needed = MIN_PULSES,
            ?intervals,
            "Not enough pulses for a rotation estimate"
        );
        return RotationEstimate::default();
    }

    let end_indices: Vec<usize> = intervals.iter().map(|iv| iv.end).collect();
    let mean_period_samples = mean_spacing(&end_indices);

    let period_seconds = if sampling_rate_hz > 0.0 {
        mean_period_samples / sampling_rate_hz
    } else {
        0.0
    };
    let rpm = if period_seconds > 0.0 {
        60.0 / period_seconds
    } else {
        0.0
    };

    RotationEstimate {
        pulse_count: intervals.len(),
        end_indices,
        mean_period_samples,
        rpm,
    }
}

/// Mean of consecutive differences. Needs at least two marks.
fn mean_spacing(marks: &[usize]) -> f64 {
    let diffs: Vec<f64> = marks
        .windows(2)
        .map(|w| w[1] as f64 - w[0] as f64)
        .collect();
    if diffs.is_empty() {
        return 0.0;
    }
    diffs.iter().sum::<f64>() / diffs.len() as f64
}
