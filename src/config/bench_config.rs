//! Bench Configuration - acquisition, filter and rotation settings as TOML
//!
//! Each section implements `Default` with the bench constants from
//! [`super::defaults`], so a missing file or a partial file behaves exactly
//! like the stock bench.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::processing::filter::{MAX_FILTER_ORDER, NORMALIZED_CUTOFF_MARGIN};
use crate::types::{Channel, CHANNEL_COUNT};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "DAMPER_BENCH_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "bench_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one test bench.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub bench: BenchInfo,

    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub rotation: RotationConfig,

    #[serde(default)]
    pub channels: ChannelConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl BenchConfig {
    /// Load configuration using the standard search order:
    /// 1. `$DAMPER_BENCH_CONFIG`
    /// 2. `./bench_config.toml`
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), bench = %config.bench.name, "Loaded bench config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(bench = %config.bench.name, "Loaded bench config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path and validate it.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every setting and report all problems at once.
    ///
    /// Out-of-range channel numbers are only warned about: the extractor
    /// clamps them into `1..=4`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let acq = &self.acquisition;

        if !acq.sampling_rate_hz.is_finite() || acq.sampling_rate_hz <= 0.0 {
            errors.push(format!(
                "acquisition.sampling_rate_hz must be positive (got {})",
                acq.sampling_rate_hz
            ));
        }
        if acq.frame_size == 0 {
            errors.push("acquisition.frame_size must be > 0".to_string());
        }
        if acq.frames_per_analysis == 0 {
            errors.push("acquisition.frames_per_analysis must be > 0".to_string());
        }
        if acq.table.trim().is_empty() {
            errors.push("acquisition.table must not be empty".to_string());
        }

        if self.filter.order == 0 || self.filter.order > MAX_FILTER_ORDER {
            errors.push(format!(
                "filter.order must be in 1..={MAX_FILTER_ORDER} (got {})",
                self.filter.order
            ));
        }
        if acq.sampling_rate_hz > 0.0 {
            let wn = self.filter.normalized_cutoff(acq.sampling_rate_hz);
            if !(wn > NORMALIZED_CUTOFF_MARGIN && wn < 1.0 - NORMALIZED_CUTOFF_MARGIN) {
                errors.push(format!(
                    "filter cutoff {:.3} Hz is {wn:.4} of Nyquist, must lie strictly inside (0, 1)",
                    self.filter.cutoff_hz()
                ));
            }
        }

        if self.analysis.poll_interval_ms == 0 {
            errors.push("analysis.poll_interval_ms must be > 0".to_string());
        }

        for (name, number) in self.channels.named().into_iter().chain([("rotation.channel", self.rotation.channel)]) {
            if !(1..=CHANNEL_COUNT as i64).contains(&number) {
                warn!(setting = name, value = number, "Channel out of range, will be clamped to 1..=4");
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({0:?}): {1}")]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({0:?}): {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Sections
// ============================================================================

/// Bench identification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchInfo {
    pub name: String,
}

impl Default for BenchInfo {
    fn default() -> Self {
        Self {
            name: "damper-bench".to_string(),
        }
    }
}

/// Recorder frame layout and sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Samples per channel per frame
    pub frame_size: usize,
    /// Samples per second per channel
    pub sampling_rate_hz: f64,
    /// Newest frames used by one analysis tick
    pub frames_per_analysis: usize,
    /// Storage table identifier
    pub table: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            frame_size: defaults::FRAME_SIZE,
            sampling_rate_hz: defaults::SAMPLING_RATE_HZ,
            frames_per_analysis: defaults::FRAMES_PER_ANALYSIS,
            table: defaults::FRAME_TABLE.to_string(),
        }
    }
}

/// Low-pass filter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub order: usize,
    /// Expected stroke frequency (Hz)
    pub fundamental_hz: f64,
    /// cutoff = fundamental * multiplier
    pub cutoff_multiplier: f64,
}

impl FilterConfig {
    pub fn cutoff_hz(&self) -> f64 {
        self.fundamental_hz * self.cutoff_multiplier
    }

    pub fn normalized_cutoff(&self, sampling_rate_hz: f64) -> f64 {
        self.cutoff_hz() / (0.5 * sampling_rate_hz)
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            order: defaults::FILTER_ORDER,
            fundamental_hz: defaults::FUNDAMENTAL_HZ,
            cutoff_multiplier: defaults::CUTOFF_MULTIPLIER,
        }
    }
}

/// Tachometer pulse detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub channel: i64,
    /// Samples strictly above this count as "pulse high"
    pub threshold: i32,
    /// Pulses to collect before the scan stops (floored at 2)
    pub min_pulses: usize,
    /// Detect pulses on the low-passed, integer-truncated channel
    pub filter_before_detect: bool,
}

impl RotationConfig {
    pub fn channel(&self) -> Channel {
        Channel::clamped(self.channel)
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            channel: defaults::ROTATION_CHANNEL,
            threshold: defaults::ROTATION_THRESHOLD,
            min_pulses: defaults::ROTATION_MIN_PULSES,
            filter_before_detect: false,
        }
    }
}

/// Channel wiring of the analog sensors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Rod force, read with the asymmetric sign policy
    pub force: i64,
    /// Rod displacement, read with the symmetric sign policy
    pub displacement: i64,
    pub temperature: i64,
}

impl ChannelConfig {
    pub fn force(&self) -> Channel {
        Channel::clamped(self.force)
    }

    pub fn displacement(&self) -> Channel {
        Channel::clamped(self.displacement)
    }

    pub fn temperature(&self) -> Channel {
        Channel::clamped(self.temperature)
    }

    fn named(&self) -> [(&'static str, i64); 3] {
        [
            ("channels.force", self.force),
            ("channels.displacement", self.displacement),
            ("channels.temperature", self.temperature),
        ]
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            force: defaults::FORCE_CHANNEL,
            displacement: defaults::DISPLACEMENT_CHANNEL,
            temperature: defaults::TEMPERATURE_CHANNEL,
        }
    }
}

/// Frame store location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(defaults::STORAGE_PATH),
        }
    }
}

/// Polling loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub poll_interval_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = BenchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.acquisition.frame_size, 2048);
        assert!((config.filter.cutoff_hz() - 500.0).abs() < 1e-12);
        let wn = config.filter.normalized_cutoff(config.acquisition.sampling_rate_hz);
        assert!(wn > 0.0 && wn < 0.05, "default cutoff is a few percent of Nyquist, got {wn}");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BenchConfig::from_toml_str(
            r#"
            [rotation]
            threshold = 4200

            [acquisition]
            frames_per_analysis = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.rotation.threshold, 4200);
        assert_eq!(config.rotation.min_pulses, defaults::ROTATION_MIN_PULSES);
        assert_eq!(config.acquisition.frames_per_analysis, 8);
        assert_eq!(config.acquisition.table, "data_records");
        assert_eq!(config.filter.order, 5);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = BenchConfig::default();
        config.acquisition.sampling_rate_hz = 0.0;
        config.acquisition.frame_size = 0;
        config.filter.order = 0;
        config.analysis.poll_interval_ms = 0;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 4, "{errors:?}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_cutoff_above_nyquist_rejected() {
        let mut config = BenchConfig::default();
        config.filter.fundamental_hz = 20_000.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Nyquist"), "{err}");
    }

    #[test]
    fn test_out_of_range_channels_are_clamped_not_rejected() {
        let config = BenchConfig::from_toml_str(
            r#"
            [channels]
            force = 0
            temperature = 9
            "#,
        )
        .unwrap();
        assert_eq!(config.channels.force(), Channel::FORCE);
        assert_eq!(config.channels.temperature(), Channel::ROTATION);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = BenchConfig::default();
        let text = config.to_toml().unwrap();
        let back = BenchConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench_config.toml");
        std::fs::write(&path, "[bench]\nname = \"rig-7\"\n").unwrap();
        let config = BenchConfig::load_from_file(&path).unwrap();
        assert_eq!(config.bench.name, "rig-7");

        let missing = BenchConfig::load_from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(..))));
    }
}
