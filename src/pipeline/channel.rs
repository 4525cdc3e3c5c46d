//! Per-channel analysis
//!
//! Glue between the processing stages: extract a channel from stored frames,
//! low-pass it, split off the residual noise and measure both.

use crate::config::RotationConfig;
use crate::processing::extract::{extract_channel, to_real};
use crate::processing::{analyze_amplitude, detect_intervals, estimate_rotation, threshold_mask, LowpassFilter};
use crate::types::{AnalysisResult, Channel, Interval, RotationEstimate, SampleFrame, SignPolicy};

/// Filter a chronological series and measure signal and noise amplitude.
///
/// An empty series yields an all-empty, all-zero result.
pub fn analyze_series(
    noisy: Vec<i32>,
    filter: &LowpassFilter,
    boundaries: Option<&[usize]>,
    policy: SignPolicy,
) -> AnalysisResult {
    if noisy.is_empty() {
        return AnalysisResult::default();
    }

    let filtered = filter.apply(&to_real(&noisy));
    let noise: Vec<f64> = noisy
        .iter()
        .zip(&filtered)
        .map(|(&raw, &smooth)| f64::from(raw) - smooth)
        .collect();

    let summary = analyze_amplitude(&filtered, &noise, boundaries, policy);

    AnalysisResult {
        noisy_series: noisy,
        filtered_series: filtered,
        noise_series: noise,
        main_amplitude: summary.main_amplitude,
        noise_amplitude: summary.noise_amplitude,
        noise_percentage: summary.noise_percentage,
    }
}

/// [`analyze_series`] on one channel of newest-first frames.
pub fn analyze_channel(
    frames: &[SampleFrame],
    channel: Channel,
    filter: &LowpassFilter,
    boundaries: Option<&[usize]>,
    policy: SignPolicy,
) -> AnalysisResult {
    analyze_series(extract_channel(frames, channel), filter, boundaries, policy)
}

/// Detect tachometer pulses and estimate rotation speed.
///
/// With `prefilter` set, pulses are detected on the low-passed channel
/// truncated to integers instead of the raw samples. The scan stops once
/// `config.min_pulses` pulses are found.
pub fn count_rotations(
    frames: &[SampleFrame],
    config: &RotationConfig,
    sampling_rate_hz: f64,
    prefilter: Option<&LowpassFilter>,
) -> RotationEstimate {
    let series = extract_channel(frames, config.channel());
    if series.is_empty() {
        return RotationEstimate::default();
    }

    let mask = match prefilter {
        Some(filter) => threshold_mask(&filter.apply_truncated(&to_real(&series)), config.threshold),
        None => threshold_mask(&series, config.threshold),
    };

    let intervals: Vec<Interval> = detect_intervals(&mask, config.min_pulses).collect();
    estimate_rotation(&intervals, sampling_rate_hz)
}
