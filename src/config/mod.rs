//! Bench Configuration Module
//!
//! Provides bench configuration loaded from TOML files, replacing hardcoded
//! acquisition, filter and rotation constants with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `DAMPER_BENCH_CONFIG` environment variable (path to TOML file)
//! 2. `bench_config.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! config::init(BenchConfig::load());
//! let rate = config::get().acquisition.sampling_rate_hz;
//! ```

mod bench_config;
pub mod defaults;

pub use bench_config::*;

use std::sync::OnceLock;

/// Global bench configuration, initialized once at startup.
static BENCH_CONFIG: OnceLock<BenchConfig> = OnceLock::new();

/// Initialize the global bench configuration.
///
/// Only the first call takes effect; later calls are logged and ignored.
pub fn init(config: BenchConfig) {
    if BENCH_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global bench configuration.
///
/// Panics if `init()` has not been called. A missing config is a fatal
/// startup error, not a recoverable condition.
#[allow(clippy::expect_used)]
pub fn get() -> &'static BenchConfig {
    BENCH_CONFIG
        .get()
        .expect("config::get() called before config::init(), this is a startup bug")
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    BENCH_CONFIG.get().is_some()
}
