//! Frame extraction
//!
//! Storage hands frames back newest first; every analysis stage wants one
//! flat channel series, oldest sample first.

use crate::types::{Channel, SampleFrame};

/// Concatenate one channel of `frames` into a chronological series.
///
/// `frames` is expected newest first (storage order) and is walked in
/// reverse. An empty slice yields an empty series: that is the normal
/// start-up state, not a fault.
pub fn extract_channel(frames: &[SampleFrame], channel: Channel) -> Vec<i32> {
    let total: usize = frames.iter().map(|f| f.channel(channel).len()).sum();
    let mut series = Vec::with_capacity(total);
    for frame in frames.iter().rev() {
        series.extend_from_slice(frame.channel(channel));
    }
    series
}

/// Convert an integer series to `f64` for filtering.
pub fn to_real(series: &[i32]) -> Vec<f64> {
    series.iter().map(|&s| f64::from(s)).collect()
}

/// Mean of a channel series, 0 when empty.
pub fn series_mean(series: &[i32]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let sum: i64 = series.iter().map(|&s| i64::from(s)).sum();
    sum as f64 / series.len() as f64
}
