//! Zero-phase Butterworth low-pass filter
//!
//! The filter is designed as cascaded second-order sections (biquads) via
//! the bilinear transform with frequency pre-warping, which keeps order-5
//! designs stable even at cutoffs of a few percent of Nyquist.
//!
//! Application is forward-backward: the signal is padded with an odd
//! extension, run through the cascade with steady-state initial conditions,
//! reversed, run again and reversed back. The result has no group delay, so
//! pulse boundaries found on the raw signal line up with the filtered one.

use std::f64::consts::PI;

use super::ProcessingError;

/// Highest filter order accepted by [`LowpassFilter::design`].
pub const MAX_FILTER_ORDER: usize = 10;

/// Normalized cutoffs closer than this to 0 or 1 are rejected.
pub const NORMALIZED_CUTOFF_MARGIN: f64 = 1e-6;

/// Second-order section coefficients, `a0` normalized to 1.
///
/// H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Gain at z = 1.
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Direct Form II transposed state that holds the output constant
    /// for a constant unit input.
    fn steady_state(&self) -> [f64; 2] {
        let gain = self.dc_gain();
        let z2 = self.b2 - self.a2 * gain;
        let z1 = self.b1 - self.a1 * gain + z2;
        [z1, z2]
    }

    /// Process one sample (Direct Form II transposed).
    #[inline]
    fn process(&self, state: &mut [f64; 2], input: f64) -> f64 {
        let output = self.b0 * input + state[0];
        state[0] = self.b1 * input - self.a1 * output + state[1];
        state[1] = self.b2 * input - self.a2 * output;
        output
    }
}

/// A designed low-pass filter, ready to apply to any number of series.
#[derive(Debug, Clone, PartialEq)]
pub struct LowpassFilter {
    sections: Vec<BiquadCoeffs>,
    order: usize,
    normalized_cutoff: f64,
}

impl LowpassFilter {
    /// Design a Butterworth low-pass filter.
    ///
    /// `normalized cutoff = cutoff_hz / (0.5 * sampling_rate_hz)` must lie
    /// strictly inside (0, 1).
    pub fn design(cutoff_hz: f64, sampling_rate_hz: f64, order: usize) -> Result<Self, ProcessingError> {
        if !sampling_rate_hz.is_finite() || sampling_rate_hz <= 0.0 {
            return Err(ProcessingError::InvalidSamplingRate(sampling_rate_hz));
        }
        if order == 0 || order > MAX_FILTER_ORDER {
            return Err(ProcessingError::InvalidFilterOrder {
                order,
                max: MAX_FILTER_ORDER,
            });
        }

        let nyquist = 0.5 * sampling_rate_hz;
        let normalized_cutoff = cutoff_hz / nyquist;
        // Written so that NaN also fails.
        let in_range = normalized_cutoff > NORMALIZED_CUTOFF_MARGIN
            && normalized_cutoff < 1.0 - NORMALIZED_CUTOFF_MARGIN;
        if !in_range {
            return Err(ProcessingError::InvalidFilterParameter { normalized_cutoff });
        }

        let warped = (PI * normalized_cutoff / 2.0).tan();
        let sections = design_sections(warped, order);

        tracing::debug!(
            order,
            normalized_cutoff,
            sections = sections.len(),
            "Designed Butterworth low-pass"
        );

        Ok(Self {
            sections,
            order,
            normalized_cutoff,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn normalized_cutoff(&self) -> f64 {
        self.normalized_cutoff
    }

    pub fn sections(&self) -> &[BiquadCoeffs] {
        &self.sections
    }

    /// Edge padding used by [`apply`](Self::apply) for a series of `len`
    /// samples.
    pub fn pad_len(&self, len: usize) -> usize {
        (3 * (self.order + 1)).min(len.saturating_sub(1))
    }

    /// Zero-phase filtering, real-valued output of the same length.
    pub fn apply(&self, series: &[f64]) -> Vec<f64> {
        let n = series.len();
        if n == 0 {
            return Vec::new();
        }

        let pad = self.pad_len(n);
        let extended = odd_extend(series, pad);

        let start = extended[0];
        let mut forward = self.run_cascade(&extended, start);
        forward.reverse();

        let start = forward[0];
        let mut backward = self.run_cascade(&forward, start);
        backward.reverse();

        backward.drain(..pad);
        backward.truncate(n);
        backward
    }

    /// Zero-phase filtering for pulse/digital channels: output truncated
    /// toward zero.
    pub fn apply_truncated(&self, series: &[f64]) -> Vec<i32> {
        self.apply(series).into_iter().map(truncate_sample).collect()
    }

    /// Run the full cascade once, states primed for a constant `initial`
    /// input.
    fn run_cascade(&self, input: &[f64], initial: f64) -> Vec<f64> {
        let mut states: Vec<[f64; 2]> = Vec::with_capacity(self.sections.len());
        let mut level = initial;
        for section in &self.sections {
            let [z1, z2] = section.steady_state();
            states.push([z1 * level, z2 * level]);
            level *= section.dc_gain();
        }

        input
            .iter()
            .map(|&x| {
                self.sections
                    .iter()
                    .zip(states.iter_mut())
                    .fold(x, |acc, (section, state)| section.process(state, acc))
            })
            .collect()
    }
}

/// Second-order sections of an analog Butterworth prototype mapped through
/// the bilinear transform. `warped` is `tan(pi * fc / fs)`.
fn design_sections(warped: f64, order: usize) -> Vec<BiquadCoeffs> {
    let num_sections = order.div_ceil(2);
    let mut sections = Vec::with_capacity(num_sections);
    let w2 = warped * warped;

    for k in 0..num_sections {
        if order % 2 == 1 && k == num_sections - 1 {
            // Real pole: H(s) = w / (s + w)
            let b = warped / (1.0 + warped);
            sections.push(BiquadCoeffs {
                b0: b,
                b1: b,
                b2: 0.0,
                a1: (warped - 1.0) / (warped + 1.0),
                a2: 0.0,
            });
        } else {
            // Conjugate pole pair: H(s) = w^2 / (s^2 + c*w*s + w^2)
            let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
            let c = 2.0 * theta.sin();
            let a0 = 1.0 + c * warped + w2;
            sections.push(BiquadCoeffs {
                b0: w2 / a0,
                b1: 2.0 * w2 / a0,
                b2: w2 / a0,
                a1: 2.0 * (w2 - 1.0) / a0,
                a2: (1.0 - c * warped + w2) / a0,
            });
        }
    }

    sections
}

/// Odd extension: mirror `pad` samples about each end point.
fn odd_extend(series: &[f64], pad: usize) -> Vec<f64> {
    let n = series.len();
    let first = series[0];
    let last = series[n - 1];

    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend((1..=pad).rev().map(|i| 2.0 * first - series[i]));
    out.extend_from_slice(series);
    out.extend((1..=pad).map(|i| 2.0 * last - series[n - 1 - i]));
    out
}

// Float-to-int `as` saturates, which is what a clipped pulse channel wants.
#[allow(clippy::cast_possible_truncation)]
fn truncate_sample(value: f64) -> i32 {
    value.trunc() as i32
}

/// Design and apply in one call, real-valued output.
pub fn lowpass_filter(
    series: &[f64],
    cutoff_hz: f64,
    sampling_rate_hz: f64,
    order: usize,
) -> Result<Vec<f64>, ProcessingError> {
    Ok(LowpassFilter::design(cutoff_hz, sampling_rate_hz, order)?.apply(series))
}

/// Design and apply in one call, output truncated to integers.
pub fn lowpass_filter_truncated(
    series: &[f64],
    cutoff_hz: f64,
    sampling_rate_hz: f64,
    order: usize,
) -> Result<Vec<i32>, ProcessingError> {
    Ok(LowpassFilter::design(cutoff_hz, sampling_rate_hz, order)?.apply_truncated(series))
}
