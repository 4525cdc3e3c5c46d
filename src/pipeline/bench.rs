//! Bench cycle
//!
//! One dashboard refresh: rotation from the tachometer channel, force and
//! displacement amplitudes windowed by whole revolutions, and the mean
//! temperature.

use super::channel::{analyze_channel, count_rotations};
use super::PipelineError;
use crate::config::{BenchConfig, ChannelConfig, RotationConfig};
use crate::processing::extract::{extract_channel, series_mean};
use crate::processing::{LowpassFilter, ProcessingError};
use crate::storage::FrameSource;
use crate::types::{BenchSnapshot, SampleFrame, SignPolicy};

/// Reusable bench analyzer: the filter is designed once per configuration.
#[derive(Debug, Clone)]
pub struct BenchAnalyzer {
    filter: LowpassFilter,
    sampling_rate_hz: f64,
    rotation: RotationConfig,
    channels: ChannelConfig,
    table: String,
    frames_per_analysis: usize,
}

impl BenchAnalyzer {
    /// Fails on an invalid sampling rate, filter order or cutoff.
    pub fn new(config: &BenchConfig) -> Result<Self, ProcessingError> {
        let fs = config.acquisition.sampling_rate_hz;
        let filter = LowpassFilter::design(config.filter.cutoff_hz(), fs, config.filter.order)?;

        tracing::debug!(
            cutoff_hz = config.filter.cutoff_hz(),
            normalized_cutoff = filter.normalized_cutoff(),
            order = filter.order(),
            sections = filter.sections().len(),
            "Bench filter designed"
        );

        Ok(Self {
            filter,
            sampling_rate_hz: fs,
            rotation: config.rotation.clone(),
            channels: config.channels.clone(),
            table: config.acquisition.table.clone(),
            frames_per_analysis: config.acquisition.frames_per_analysis,
        })
    }

    pub fn filter(&self) -> &LowpassFilter {
        &self.filter
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn frames_per_analysis(&self) -> usize {
        self.frames_per_analysis
    }

    /// Analyze newest-first frames. Empty input gives a zeroed snapshot.
    pub fn analyze(&self, frames: &[SampleFrame]) -> BenchSnapshot {
        if frames.is_empty() {
            return BenchSnapshot::default();
        }

        let prefilter = self.rotation.filter_before_detect.then_some(&self.filter);
        let rotation = count_rotations(frames, &self.rotation, self.sampling_rate_hz, prefilter);

        // Idle or stalled bench: fall back to whole-series amplitudes.
        let boundaries = rotation.has_boundaries().then_some(rotation.end_indices.as_slice());
        if boundaries.is_none() {
            tracing::debug!(frames = frames.len(), "No rotation boundaries, using global amplitudes");
        }

        let force = analyze_channel(
            frames,
            self.channels.force(),
            &self.filter,
            boundaries,
            SignPolicy::Asymmetric,
        );
        let displacement = analyze_channel(
            frames,
            self.channels.displacement(),
            &self.filter,
            boundaries,
            SignPolicy::Symmetric,
        );
        let temperature_mean = series_mean(&extract_channel(frames, self.channels.temperature()));

        BenchSnapshot {
            frames_used: frames.len(),
            newest_sequence: frames.iter().map(|f| f.sequence_number).max(),
            force: force.summary(),
            displacement: displacement.summary(),
            rotation,
            temperature_mean,
        }
    }

    /// Fetch the newest frames from `source` and analyze them.
    pub fn poll<S: FrameSource + ?Sized>(&self, source: &S) -> Result<BenchSnapshot, PipelineError> {
        let frames = source.fetch_recent_frames(&self.table, self.frames_per_analysis)?;
        Ok(self.analyze(&frames))
    }
}

/// One-shot bench cycle over newest-first frames.
pub fn analyze_bench_cycle(frames: &[SampleFrame], config: &BenchConfig) -> Result<BenchSnapshot, ProcessingError> {
    Ok(BenchAnalyzer::new(config)?.analyze(frames))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{BenchSimulator, SimulationConfig};
    use crate::storage::StorageError;

    fn config() -> BenchConfig {
        let mut cfg = BenchConfig::default();
        cfg.acquisition.frame_size = 1024;
        cfg.acquisition.frames_per_analysis = 20;
        cfg
    }

    fn simulated(cfg: &BenchConfig, frames: usize) -> Vec<SampleFrame> {
        let mut sim = BenchSimulator::new(SimulationConfig {
            frame_size: cfg.acquisition.frame_size,
            sampling_rate_hz: cfg.acquisition.sampling_rate_hz,
            seed: 7,
            ..SimulationConfig::default()
        });
        let mut out: Vec<SampleFrame> = (0..frames).map(|_| sim.next_frame()).collect();
        out.reverse();
        out
    }

    #[test]
    fn test_empty_frames_give_zeroed_snapshot() {
        let snapshot = analyze_bench_cycle(&[], &config()).unwrap();
        assert_eq!(snapshot, BenchSnapshot::default());
    }

    #[test]
    fn test_invalid_cutoff_is_rejected() {
        let mut cfg = config();
        cfg.filter.fundamental_hz = cfg.acquisition.sampling_rate_hz;
        let err = analyze_bench_cycle(&[], &cfg).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidFilterParameter { .. }));
    }

    #[test]
    fn test_invalid_sampling_rate_is_rejected() {
        let mut cfg = config();
        cfg.acquisition.sampling_rate_hz = 0.0;
        assert!(!analyze_bench_cycle(&[], &cfg).unwrap_err().is_insufficient_data());
    }

    #[test]
    fn test_simulated_bench_cycle() {
        let cfg = config();
        let frames = simulated(&cfg, 20);
        let snapshot = analyze_bench_cycle(&frames, &cfg).unwrap();

        assert_eq!(snapshot.frames_used, 20);
        assert_eq!(snapshot.newest_sequence, Some(20));
        assert_eq!(snapshot.rotation.pulse_count, cfg.rotation.min_pulses);
        // 2048 samples per revolution at the default 1500 rpm
        assert!((snapshot.rotation.mean_period_samples - 2048.0).abs() < 1e-9);
        assert!((snapshot.rotation.rpm - 1500.0).abs() < 1e-6, "rpm {}", snapshot.rotation.rpm);

        let sim = SimulationConfig::default();
        let expected_force = 2.0 * sim.force_amplitude;
        assert!(
            (snapshot.force.main_amplitude - expected_force).abs() < 0.1 * expected_force,
            "force {}",
            snapshot.force.main_amplitude
        );
        assert!(snapshot.force.noise_percentage > 0.0);
        assert!(snapshot.force.noise_percentage < 50.0);

        let expected_disp = 2.0 * sim.displacement_amplitude;
        assert!(
            (snapshot.displacement.main_amplitude - expected_disp).abs() < 0.1 * expected_disp,
            "displacement {}",
            snapshot.displacement.main_amplitude
        );
        assert!((snapshot.temperature_mean - sim.temperature).abs() < 5.0);
    }

    #[test]
    fn test_prefiltered_rotation_agrees() {
        let mut cfg = config();
        let frames = simulated(&cfg, 20);
        let raw = analyze_bench_cycle(&frames, &cfg).unwrap();

        cfg.rotation.filter_before_detect = true;
        let filtered = analyze_bench_cycle(&frames, &cfg).unwrap();
        assert_eq!(filtered.rotation.pulse_count, raw.rotation.pulse_count);
        assert!((filtered.rotation.rpm - raw.rotation.rpm).abs() < 5.0);
    }

    #[test]
    fn test_idle_bench_uses_global_amplitudes() {
        let cfg = config();
        let mut sim = BenchSimulator::new(SimulationConfig {
            frame_size: cfg.acquisition.frame_size,
            rpm: 0.0,
            ..SimulationConfig::default()
        });
        let frames: Vec<SampleFrame> = (0..4).map(|_| sim.next_frame()).collect();
        let snapshot = analyze_bench_cycle(&frames, &cfg).unwrap();
        assert_eq!(snapshot.rotation.pulse_count, 0);
        assert!(snapshot.force.main_amplitude > 0.0);
        assert!(snapshot.force.main_amplitude < SimulationConfig::default().force_amplitude);
    }

    struct FixedSource(Vec<SampleFrame>);

    impl FrameSource for FixedSource {
        fn fetch_recent_frames(&self, _table: &str, count: usize) -> Result<Vec<SampleFrame>, StorageError> {
            Ok(self.0.iter().take(count).cloned().collect())
        }
    }

    #[test]
    fn test_poll_limits_frame_count() {
        let cfg = config();
        let source = FixedSource(simulated(&cfg, 30));
        let analyzer = BenchAnalyzer::new(&cfg).unwrap();
        let snapshot = analyzer.poll(&source).unwrap();
        assert_eq!(snapshot.frames_used, cfg.acquisition.frames_per_analysis);
        assert_eq!(snapshot.newest_sequence, Some(30));
    }
}
