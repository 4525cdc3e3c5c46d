//! Shared data structures for the damper test bench
//!
//! This module defines the records that flow through the analysis pipeline:
//! - SampleFrame (one recorded frame, four channels)
//! - Channel (1-based channel selector, clamped)
//! - Interval (half-open pulse run inside a channel series)
//! - RotationEstimate (pulse timing and RPM)
//! - AmplitudeSummary / AnalysisResult (amplitude and noise metrics)
//! - BenchSnapshot (one dashboard tick)
//!
//! Everything here is plain data: no behaviour beyond small accessors,
//! and all outbound records serialize with serde.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Number of sensor channels carried by every frame.
pub const CHANNEL_COUNT: usize = 4;

// ============================================================================
// Frames
// ============================================================================

/// One recorded frame as persisted by the recorder.
///
/// All four channel arrays have the same length (the configured frame size).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFrame {
    /// Wall-clock time the recorder stamped on the frame
    pub timestamp: NaiveDateTime,
    /// Recorder frame counter (strictly increasing within one recording)
    pub sequence_number: u64,
    /// Raw integer samples, index 0 = channel 1
    pub channels: [Vec<i32>; CHANNEL_COUNT],
}

impl SampleFrame {
    pub fn new(timestamp: NaiveDateTime, sequence_number: u64, channels: [Vec<i32>; CHANNEL_COUNT]) -> Self {
        Self {
            timestamp,
            sequence_number,
            channels,
        }
    }

    /// Samples of one channel.
    pub fn channel(&self, channel: Channel) -> &[i32] {
        &self.channels[channel.index()]
    }

    /// Number of samples per channel (taken from channel 1).
    pub fn frame_size(&self) -> usize {
        self.channels[0].len()
    }

    /// True when every channel carries exactly `frame_size` samples.
    pub fn is_consistent(&self, frame_size: usize) -> bool {
        self.channels.iter().all(|c| c.len() == frame_size)
    }

    /// Arithmetic mean of every channel. Empty channels report 0.
    pub fn channel_means(&self) -> FrameMeans {
        let mut means = [0.0; CHANNEL_COUNT];
        for (mean, samples) in means.iter_mut().zip(self.channels.iter()) {
            if !samples.is_empty() {
                let sum: i64 = samples.iter().map(|&s| i64::from(s)).sum();
                *mean = sum as f64 / samples.len() as f64;
            }
        }
        FrameMeans {
            timestamp: self.timestamp,
            sequence_number: self.sequence_number,
            means,
        }
    }
}

/// Per-channel averages of a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMeans {
    pub timestamp: NaiveDateTime,
    pub sequence_number: u64,
    pub means: [f64; CHANNEL_COUNT],
}

/// Sensor channel selector, 1-based like the bench wiring labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", from = "i64")]
pub struct Channel(u8);

impl Channel {
    pub const FORCE: Self = Self(1);
    pub const DISPLACEMENT: Self = Self(2);
    pub const TEMPERATURE: Self = Self(3);
    pub const ROTATION: Self = Self(4);

    /// Build a channel from any integer, clamping into `1..=4`.
    pub fn clamped(number: i64) -> Self {
        // Clamped into 1..=4 so the narrowing cast cannot truncate.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = number.clamp(1, CHANNEL_COUNT as i64) as u8;
        Self(n)
    }

    /// 1-based channel number.
    pub fn number(self) -> u8 {
        self.0
    }

    /// 0-based index into `SampleFrame::channels`.
    pub fn index(self) -> usize {
        usize::from(self.0) - 1
    }
}

impl From<i64> for Channel {
    fn from(number: i64) -> Self {
        Self::clamped(number)
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> Self {
        channel.0
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

// ============================================================================
// Interval detection
// ============================================================================

/// Half-open `[start, end)` run of above-threshold samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Rotation timing derived from pulse intervals.
///
/// A zeroed estimate (`RotationEstimate::default()`) means no rotation
/// could be measured, which is the normal state of an idle bench.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationEstimate {
    /// Number of pulses detected
    pub pulse_count: usize,
    /// End index of every pulse, in order
    pub end_indices: Vec<usize>,
    /// Mean pulse-to-pulse period in samples
    pub mean_period_samples: f64,
    /// Revolutions per minute (one pulse = one revolution)
    pub rpm: f64,
}

impl RotationEstimate {
    /// True when enough pulses were found to bound amplitude windows.
    pub fn has_boundaries(&self) -> bool {
        self.end_indices.len() >= 2
    }
}

// ============================================================================
// Amplitude analysis
// ============================================================================

/// How window extrema are picked during windowed amplitude analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignPolicy {
    /// Max taken over positive samples only (floor 1), min over negative
    /// samples only (ceiling 0).
    #[default]
    Asymmetric,
    /// Max and min over the whole window, with the same floor 1 and
    /// ceiling 0.
    Symmetric,
}

/// Scalar amplitude metrics of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeSummary {
    pub main_amplitude: f64,
    pub noise_amplitude: f64,
    /// `100 * noise / main`, or 0 when the main amplitude is 0
    pub noise_percentage: f64,
}

/// Full result of analysing one channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Raw samples in chronological order
    pub noisy_series: Vec<i32>,
    /// Zero-phase low-pass output
    pub filtered_series: Vec<f64>,
    /// `noisy - filtered`
    pub noise_series: Vec<f64>,
    pub main_amplitude: f64,
    pub noise_amplitude: f64,
    pub noise_percentage: f64,
}

impl AnalysisResult {
    pub fn summary(&self) -> AmplitudeSummary {
        AmplitudeSummary {
            main_amplitude: self.main_amplitude,
            noise_amplitude: self.noise_amplitude,
            noise_percentage: self.noise_percentage,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.noisy_series.is_empty()
    }
}

// ============================================================================
// Bench cycle
// ============================================================================

/// Everything the dashboard shows for one refresh tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchSnapshot {
    /// Frames that contributed to this snapshot
    pub frames_used: usize,
    /// Newest frame counter seen, if any
    pub newest_sequence: Option<u64>,
    pub rotation: RotationEstimate,
    /// Rod force amplitude (asymmetric windows)
    pub force: AmplitudeSummary,
    /// Rod displacement amplitude (symmetric windows)
    pub displacement: AmplitudeSummary,
    /// Mean of the temperature channel
    pub temperature_mean: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, 7)
            .and_then(|d| d.and_hms_milli_opt(12, 0, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_channel_clamping() {
        assert_eq!(Channel::clamped(0), Channel::FORCE);
        assert_eq!(Channel::clamped(-7), Channel::FORCE);
        assert_eq!(Channel::clamped(3), Channel::TEMPERATURE);
        assert_eq!(Channel::clamped(9), Channel::ROTATION);
        assert_eq!(Channel::ROTATION.index(), 3);
    }

    #[test]
    fn test_channel_deserializes_clamped() {
        let ch: Channel = serde_json::from_str("12").unwrap();
        assert_eq!(ch.number(), 4);
        assert_eq!(serde_json::to_string(&Channel::DISPLACEMENT).unwrap(), "2");
    }

    #[test]
    fn test_frame_channel_means() {
        let frame = SampleFrame::new(
            ts(),
            3,
            [vec![1, 2, 3], vec![-4, 4, 0], vec![10, 10, 10], vec![]],
        );
        let means = frame.channel_means();
        assert_eq!(means.sequence_number, 3);
        assert!((means.means[0] - 2.0).abs() < 1e-12);
        assert!(means.means[1].abs() < 1e-12);
        assert!((means.means[2] - 10.0).abs() < 1e-12);
        assert!(means.means[3].abs() < 1e-12);
        assert!(!frame.is_consistent(3));
    }

    #[test]
    fn test_interval_len() {
        let iv = Interval::new(2, 5);
        assert_eq!(iv.len(), 3);
        assert!(!iv.is_empty());
    }
}
