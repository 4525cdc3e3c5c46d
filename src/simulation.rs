//! Synthetic Bench
//!
//! Deterministic generator of realistic bench frames for tests and for the
//! `simulate` command. A crank turning at `rpm` drives the damper rod:
//!
//! - force: sine at the rotation frequency plus Gaussian noise
//! - displacement: sine at the rotation frequency, quarter period ahead
//! - temperature: slow upward drift with light noise
//! - rotation: tachometer pulse train, one pulse per revolution
//!
//! The same seed always yields the same frames.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

use crate::config::defaults;
use crate::types::SampleFrame;

/// Generator settings
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub frame_size: usize,
    pub sampling_rate_hz: f64,
    /// Crank speed; 0 leaves the bench idle
    pub rpm: f64,
    /// Force sine peak, in counts
    pub force_amplitude: f64,
    pub force_noise_std: f64,
    /// Displacement sine peak, in counts
    pub displacement_amplitude: f64,
    pub displacement_noise_std: f64,
    /// Temperature baseline, in counts
    pub temperature: f64,
    /// Temperature rise per frame, in counts
    pub temperature_drift: f64,
    /// Tachometer level while the pulse is high
    pub pulse_high: f64,
    /// Fraction of a revolution the pulse stays high
    pub pulse_duty: f64,
    /// Timestamp of the first frame
    pub start: NaiveDateTime,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frame_size: defaults::FRAME_SIZE,
            sampling_rate_hz: defaults::SAMPLING_RATE_HZ,
            rpm: 1500.0,
            force_amplitude: 2000.0,
            force_noise_std: 100.0,
            displacement_amplitude: 1200.0,
            displacement_noise_std: 20.0,
            temperature: 2500.0,
            temperature_drift: 0.05,
            pulse_high: 6000.0,
            pulse_duty: 0.1,
            start: NaiveDate::from_ymd_opt(2025, 1, 1)
                .and_then(|d| d.and_hms_opt(8, 0, 0))
                .unwrap_or_default(),
            seed: 42,
        }
    }
}

/// Stateful frame generator
pub struct BenchSimulator {
    config: SimulationConfig,
    rng: StdRng,
    force_noise: Option<Normal<f64>>,
    displacement_noise: Option<Normal<f64>>,
    temperature_noise: Option<Normal<f64>>,
    sample_index: u64,
    sequence: u64,
}

impl BenchSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        let noise = |std: f64, name: &str| {
            let dist = Normal::new(0.0, std).ok();
            if dist.is_none() {
                tracing::warn!(std, channel = name, "Invalid noise level, channel will be noise-free");
            }
            dist
        };

        Self {
            rng: StdRng::seed_from_u64(config.seed),
            force_noise: noise(config.force_noise_std, "force"),
            displacement_noise: noise(config.displacement_noise_std, "displacement"),
            temperature_noise: noise(1.0, "temperature"),
            sample_index: 0,
            sequence: 0,
            config,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Generate the next frame. Frame counters start at 1.
    pub fn next_frame(&mut self) -> SampleFrame {
        let cfg = &self.config;
        let n = cfg.frame_size;
        let fs = if cfg.sampling_rate_hz > 0.0 {
            cfg.sampling_rate_hz
        } else {
            defaults::SAMPLING_RATE_HZ
        };
        let revs_per_sample = cfg.rpm.max(0.0) / 60.0 / fs;
        let temperature_base = cfg.temperature + cfg.temperature_drift * self.sequence as f64;

        let mut force = Vec::with_capacity(n);
        let mut displacement = Vec::with_capacity(n);
        let mut temperature = Vec::with_capacity(n);
        let mut rotation = Vec::with_capacity(n);

        for i in 0..n as u64 {
            let phase = ((self.sample_index + i) as f64 * revs_per_sample).fract();
            let angle = 2.0 * PI * phase;

            let f = cfg.force_amplitude * angle.sin() + sample(&mut self.rng, self.force_noise.as_ref());
            let d = cfg.displacement_amplitude * angle.cos()
                + sample(&mut self.rng, self.displacement_noise.as_ref());
            let t = temperature_base + sample(&mut self.rng, self.temperature_noise.as_ref());
            let r = if revs_per_sample > 0.0 && phase >= 0.5 && phase < 0.5 + cfg.pulse_duty {
                cfg.pulse_high
            } else {
                0.0
            };

            force.push(to_count(f));
            displacement.push(to_count(d));
            temperature.push(to_count(t));
            rotation.push(to_count(r));
        }

        self.sample_index += n as u64;
        self.sequence += 1;

        let elapsed_us = (self.sample_index - n as u64) as f64 / fs * 1e6;
        let timestamp = self.config.start + Duration::microseconds(elapsed_us as i64);

        SampleFrame::new(timestamp, self.sequence, [force, displacement, temperature, rotation])
    }

    /// Generate `count` frames, oldest first.
    pub fn take_frames(&mut self, count: usize) -> Vec<SampleFrame> {
        (0..count).map(|_| self.next_frame()).collect()
    }
}

fn sample(rng: &mut StdRng, dist: Option<&Normal<f64>>) -> f64 {
    dist.map_or(0.0, |d| d.sample(rng))
}

// Float-to-int `as` saturates at the i32 range.
#[allow(clippy::cast_possible_truncation)]
fn to_count(value: f64) -> i32 {
    value.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Channel;

    #[test]
    fn test_same_seed_same_frames() {
        let cfg = SimulationConfig {
            frame_size: 256,
            ..SimulationConfig::default()
        };
        let a = BenchSimulator::new(cfg.clone()).take_frames(3);
        let b = BenchSimulator::new(cfg).take_frames(3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_frames_are_consistent_and_numbered() {
        let mut sim = BenchSimulator::new(SimulationConfig {
            frame_size: 128,
            ..SimulationConfig::default()
        });
        let frames = sim.take_frames(4);
        for (i, frame) in frames.iter().enumerate() {
            assert!(frame.is_consistent(128));
            assert_eq!(frame.sequence_number, i as u64 + 1);
        }
        assert!(frames[3].timestamp > frames[0].timestamp);
    }

    #[test]
    fn test_one_pulse_per_revolution() {
        // 1500 rpm at 51.2 kHz: 2048 samples per revolution
        let mut sim = BenchSimulator::new(SimulationConfig {
            frame_size: 2048,
            ..SimulationConfig::default()
        });
        let frame = sim.next_frame();
        let rising = frame
            .channel(Channel::ROTATION)
            .windows(2)
            .filter(|w| w[0] <= 5000 && w[1] > 5000)
            .count();
        assert_eq!(rising, 1);
    }

    #[test]
    fn test_idle_bench_has_flat_tachometer() {
        let mut sim = BenchSimulator::new(SimulationConfig {
            frame_size: 512,
            rpm: 0.0,
            ..SimulationConfig::default()
        });
        let frame = sim.next_frame();
        assert!(frame.channel(Channel::ROTATION).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_negative_noise_level_is_tolerated() {
        let mut sim = BenchSimulator::new(SimulationConfig {
            frame_size: 64,
            force_noise_std: -1.0,
            force_amplitude: 0.0,
            rpm: 0.0,
            ..SimulationConfig::default()
        });
        let frame = sim.next_frame();
        assert!(frame.channel(Channel::FORCE).iter().all(|&v| v == 0));
    }
}
