//! Signal and noise amplitude
//!
//! Two modes:
//! - global: `2 * max|x|` over the whole series (one-sided peak standing in
//!   for peak-to-peak swing)
//! - windowed: the series is cut at consecutive boundaries and the
//!   per-window envelope `max + |min|` is averaged
//!
//! The window max is floored at 1 and the window min capped at 0 under both
//! policies, so a degenerate window never yields a zero amplitude and a
//! one-signed window reports its peak distance from zero. Under
//! [`SignPolicy::Asymmetric`] only positive samples feed the max and only
//! negative samples feed the min. The floor biases degenerate windows upward
//! slightly and is kept as-is.

use crate::types::{AmplitudeSummary, SignPolicy};

/// Lower bound of a window max.
pub const MAX_FLOOR: f64 = 1.0;

/// Upper bound of a window min.
pub const MIN_CEILING: f64 = 0.0;

/// Amplitude and noise metrics for one channel.
///
/// `boundaries = None` selects global mode; `Some(b)` selects windowed mode
/// over `[b[i], b[i+1])`. Fewer than two boundaries means no windows and a
/// zero amplitude. An empty `filtered` series yields all zeros.
pub fn analyze_amplitude(
    filtered: &[f64],
    noise: &[f64],
    boundaries: Option<&[usize]>,
    policy: SignPolicy,
) -> AmplitudeSummary {
    if filtered.is_empty() {
        return AmplitudeSummary::default();
    }

    let (main_amplitude, noise_amplitude) = match boundaries {
        None => (global_amplitude(filtered), global_amplitude(noise)),
        Some(bounds) => (
            windowed_amplitude(filtered, bounds, policy),
            windowed_amplitude(noise, bounds, policy),
        ),
    };

    AmplitudeSummary {
        main_amplitude,
        noise_amplitude,
        noise_percentage: noise_percentage(main_amplitude, noise_amplitude),
    }
}

/// `100 * noise / main`, 0 when `main` is not positive.
pub fn noise_percentage(main_amplitude: f64, noise_amplitude: f64) -> f64 {
    if main_amplitude > 0.0 {
        noise_amplitude / main_amplitude * 100.0
    } else {
        0.0
    }
}

/// `2 * max|x|`, 0 for an empty series.
pub fn global_amplitude(series: &[f64]) -> f64 {
    2.0 * series.iter().fold(0.0_f64, |m, &v| m.max(v.abs()))
}

/// Mean envelope over every `[b[i], b[i+1])` window.
pub fn windowed_amplitude(series: &[f64], boundaries: &[usize], policy: SignPolicy) -> f64 {
    let amplitudes: Vec<f64> = boundaries
        .windows(2)
        .map(|pair| window_amplitude(slice_window(series, pair[0], pair[1]), policy))
        .collect();

    if amplitudes.is_empty() {
        return 0.0;
    }
    amplitudes.iter().sum::<f64>() / amplitudes.len() as f64
}

/// Envelope of a single window: `max(1, max) + |min(0, min)|`.
pub fn window_amplitude(window: &[f64], policy: SignPolicy) -> f64 {
    let (max, min) = match policy {
        SignPolicy::Asymmetric => (
            window.iter().copied().filter(|&v| v > 0.0).fold(MAX_FLOOR, f64::max),
            window.iter().copied().filter(|&v| v < 0.0).fold(MIN_CEILING, f64::min),
        ),
        SignPolicy::Symmetric => (
            window.iter().copied().fold(MAX_FLOOR, f64::max),
            window.iter().copied().fold(MIN_CEILING, f64::min),
        ),
    };
    max + min.abs()
}

/// `series[lo..hi]` with both ends clamped to the series; empty if `lo >= hi`.
fn slice_window(series: &[f64], lo: usize, hi: usize) -> &[f64] {
    let hi = hi.min(series.len());
    let lo = lo.min(hi);
    &series[lo..hi]
}
