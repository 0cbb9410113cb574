//! Runtime configuration loading from environment variables.
//!
//! All configuration values are loaded from `STRATA_*` environment variables
//! with sensible defaults. Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `STRATA_POOL_INITIAL_BYTES` | 268435456 | Initial device pool capacity (bytes) |
//! | `STRATA_POOL_MAX_BYTES` | 4294967296 | Device pool growth ceiling (bytes) |
//! | `STRATA_DEVICE_INDEX` | 0 | Device the pool lives on |
//! | `STRATA_LOG_LEVEL` | info | Log level filter |
//! | `STRATA_MINOR_VERSION_COMPAT` | unset | Minor-version-compatibility flag (read-once) |

use crate::memory::PoolConfig;
use crate::telemetry::{LogConfig, LogOutput};

/// Effective runtime configuration summary.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub pool_initial_bytes: usize,
    pub pool_max_bytes: usize,
    pub device_index: usize,
    pub log_level: String,
    pub minor_version_compat: bool,
}

/// All runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub pool: PoolConfig,
    pub log: LogConfig,
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Load pool configuration from environment.
fn load_pool_config() -> PoolConfig {
    let defaults = PoolConfig::default();
    let initial = parse_usize("STRATA_POOL_INITIAL_BYTES", defaults.initial_bytes);
    let max = parse_usize("STRATA_POOL_MAX_BYTES", defaults.max_bytes);
    let device_index = parse_usize("STRATA_DEVICE_INDEX", defaults.device_index);
    let initial = initial.max(1024 * 1024); // floor: 1 MiB
    let max = max.max(initial);             // ceiling >= initial
    PoolConfig { initial_bytes: initial, max_bytes: max, device_index }
}

/// Load logging configuration from environment.
fn load_log_config() -> LogConfig {
    let level = std::env::var("STRATA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    LogConfig { level, output: LogOutput::Stderr }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    EnvConfig {
        pool: load_pool_config(),
        log: load_log_config(),
    }
}

impl EnvConfig {
    /// Return a summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            pool_initial_bytes: self.pool.initial_bytes,
            pool_max_bytes: self.pool.max_bytes,
            device_index: self.pool.device_index,
            log_level: self.log.level.clone(),
            minor_version_compat: crate::setup::compatibility_mode_enabled(),
        }
    }
}
