//! Threshold pulse detection
//!
//! A channel is turned into a boolean mask (`sample > threshold`) and the
//! mask is scanned left to right for contiguous `true` runs. Scanning stops
//! as soon as the requested number of pulses has been emitted; timing only
//! needs a bounded number of pulses, so the rest of the buffer is never
//! inspected.

use super::ProcessingError;
use crate::processing::rotation::MIN_PULSES;
use crate::types::Interval;

/// `true` wherever `series[i] > threshold`.
pub fn threshold_mask<T: PartialOrd + Copy>(series: &[T], threshold: T) -> Vec<bool> {
    series.iter().map(|&s| s > threshold).collect()
}

/// Lazy scanner over a threshold mask.
///
/// Yields `[start, end)` runs in order. After `limit` runs have been
/// yielded it stops without looking further. A run still open when the mask
/// ends is yielded as `[start, mask.len())` only while fewer than `limit`
/// runs have been emitted.
///
/// Each detector owns its own cursor, so independent scans of the same mask
/// never interfere.
#[derive(Debug, Clone)]
pub struct IntervalDetector<'a> {
    mask: &'a [bool],
    limit: usize,
    pos: usize,
    open: Option<usize>,
    emitted: usize,
    done: bool,
}

impl<'a> IntervalDetector<'a> {
    /// Scanner that stops after `limit` intervals. No floor is applied;
    /// see [`detect_intervals`] for the floored variant.
    pub fn new(mask: &'a [bool], limit: usize) -> Self {
        Self {
            mask,
            limit,
            pos: 0,
            open: None,
            emitted: 0,
            done: false,
        }
    }

    /// Intervals emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl Iterator for IntervalDetector<'_> {
    type Item = Interval;

    fn next(&mut self) -> Option<Interval> {
        if self.done {
            return None;
        }

        while self.pos < self.mask.len() {
            if self.emitted >= self.limit {
                self.done = true;
                return None;
            }

            let i = self.pos;
            self.pos += 1;

            if self.mask[i] {
                if self.open.is_none() {
                    self.open = Some(i);
                }
            } else if let Some(start) = self.open.take() {
                self.emitted += 1;
                return Some(Interval::new(start, i));
            }
        }

        self.done = true;
        match self.open.take() {
            Some(start) if self.emitted < self.limit => {
                self.emitted += 1;
                Some(Interval::new(start, self.mask.len()))
            }
            _ => None,
        }
    }
}

/// Lazy pulse scan with `min_count` floored at 2.
pub fn detect_intervals(mask: &[bool], min_count: usize) -> IntervalDetector<'_> {
    IntervalDetector::new(mask, min_count.max(MIN_PULSES))
}

/// Scan for exactly `min_count` pulses (floored at 2).
///
/// Returns `InsufficientPulses` when the mask runs out before the requested
/// count is reached, which always covers the "fewer than two pulses" case.
pub fn collect_intervals(mask: &[bool], min_count: usize) -> Result<Vec<Interval>, ProcessingError> {
    let needed = min_count.max(MIN_PULSES);
    let intervals: Vec<Interval> = detect_intervals(mask, needed).collect();
    if intervals.len() < needed {
        tracing::debug!(
            needed,
            found = intervals.len(),
            ?intervals,
            "Fewer pulses than requested"
        );
        return Err(ProcessingError::InsufficientPulses {
            needed,
            found: intervals.len(),
        });
    }
    Ok(intervals)
}
