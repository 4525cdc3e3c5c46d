//! Recorder Line Protocol
//!
//! The acquisition recorder prints one line per frame on stdout:
//!
//! ```text
//! DATA 4 <counter> T <hh> <mm> <ss> <ms> c1;c2;c3;c4;c1;c2;c3;c4;...;
//! ```
//!
//! Fields are space separated. Field 2 is the frame counter, fields 4-7 the
//! wall-clock time and field 8 the interleaved samples of the four channels.
//! A trailing `;` is allowed. Fields 0, 1 and 3 are not interpreted.
//!
//! Lines with three or fewer fields, or whose counter is not an integer, are
//! status chatter from the recorder and are skipped rather than rejected.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

use crate::types::{SampleFrame, CHANNEL_COUNT};

const COUNTER_FIELD: usize = 2;
const HOUR_FIELD: usize = 4;
const MINUTE_FIELD: usize = 5;
const SECOND_FIELD: usize = 6;
const MILLIS_FIELD: usize = 7;
const DATA_FIELD: usize = 8;

/// Recorder line errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecorderError {
    #[error("Missing field {index} in recorder line")]
    MissingField { index: usize },

    #[error("Invalid time {hour}:{minute}:{second}.{millis}")]
    InvalidTime {
        hour: String,
        minute: String,
        second: String,
        millis: String,
    },

    #[error("Invalid sample value '{0}'")]
    InvalidSample(String),

    #[error("Sample count {0} is not a multiple of the channel count")]
    UnevenSamples(usize),

    #[error("Frame size mismatch: expected {expected} samples per channel, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },
}

/// Parse one recorder line.
///
/// `date` supplies the calendar day (the recorder only prints time of day).
/// When `expected_frame_size` is set, frames of any other size are rejected.
///
/// Returns `Ok(None)` for lines that are not frames.
pub fn parse_line(
    line: &str,
    date: NaiveDate,
    expected_frame_size: Option<usize>,
) -> Result<Option<SampleFrame>, RecorderError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() <= 3 {
        return Ok(None);
    }
    let Ok(sequence_number) = fields[COUNTER_FIELD].parse::<u64>() else {
        return Ok(None);
    };

    let field = |index: usize| {
        fields
            .get(index)
            .copied()
            .ok_or(RecorderError::MissingField { index })
    };

    let time = parse_time(
        field(HOUR_FIELD)?,
        field(MINUTE_FIELD)?,
        field(SECOND_FIELD)?,
        field(MILLIS_FIELD)?,
    )?;

    let channels = deinterleave(field(DATA_FIELD)?)?;
    let actual = channels[0].len();
    if let Some(expected) = expected_frame_size {
        if actual != expected {
            return Err(RecorderError::FrameSizeMismatch { expected, actual });
        }
    }

    Ok(Some(SampleFrame::new(
        NaiveDateTime::new(date, time),
        sequence_number,
        channels,
    )))
}

/// Render a frame in recorder line format.
pub fn format_line(frame: &SampleFrame) -> String {
    let t = frame.timestamp.time();
    let millis = t.nanosecond() / 1_000_000;
    let n = frame.frame_size();

    let mut data = String::with_capacity(n * CHANNEL_COUNT * 6);
    for i in 0..n {
        for channel in &frame.channels {
            let sample = channel.get(i).copied().unwrap_or(0);
            data.push_str(&sample.to_string());
            data.push(';');
        }
    }

    format!(
        "DATA {CHANNEL_COUNT} {} T {:02} {:02} {:02} {:03} {data}",
        frame.sequence_number,
        t.hour(),
        t.minute(),
        t.second(),
        millis,
    )
}

fn parse_time(hour: &str, minute: &str, second: &str, millis: &str) -> Result<NaiveTime, RecorderError> {
    let invalid = || RecorderError::InvalidTime {
        hour: hour.to_string(),
        minute: minute.to_string(),
        second: second.to_string(),
        millis: millis.to_string(),
    };
    let h = hour.parse::<u32>().map_err(|_| invalid())?;
    let m = minute.parse::<u32>().map_err(|_| invalid())?;
    let s = second.parse::<u32>().map_err(|_| invalid())?;
    let ms = millis.parse::<u32>().map_err(|_| invalid())?;
    NaiveTime::from_hms_milli_opt(h, m, s, ms).ok_or_else(invalid)
}

/// Split `c1;c2;c3;c4;c1;...` into four channel arrays.
fn deinterleave(data: &str) -> Result<[Vec<i32>; CHANNEL_COUNT], RecorderError> {
    let samples = data
        .split(';')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i32>().map_err(|_| RecorderError::InvalidSample(s.to_string())))
        .collect::<Result<Vec<i32>, _>>()?;

    if samples.len() % CHANNEL_COUNT != 0 {
        return Err(RecorderError::UnevenSamples(samples.len()));
    }

    let per_channel = samples.len() / CHANNEL_COUNT;
    let mut channels: [Vec<i32>; CHANNEL_COUNT] = Default::default();
    for channel in &mut channels {
        channel.reserve(per_channel);
    }
    for group in samples.chunks_exact(CHANNEL_COUNT) {
        for (channel, &sample) in channels.iter_mut().zip(group) {
            channel.push(sample);
        }
    }
    Ok(channels)
}

/// Caller-held record of the last accepted frame counter.
///
/// The recorder may repeat a frame or restart its counter; only frames whose
/// counter is strictly greater than the last accepted one pass. The gate
/// starts at 0, so the recorder's first real frame is 1 and a counter of 0
/// never passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceGate {
    last: u64,
}

impl SequenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `sequence` if it is newer than everything seen so far.
    pub fn accept(&mut self, sequence: u64) -> bool {
        if sequence <= self.last {
            return false;
        }
        self.last = sequence;
        true
    }

    /// Last accepted counter, `None` before the first frame.
    pub fn last_accepted(&self) -> Option<u64> {
        (self.last > 0).then_some(self.last)
    }
}
