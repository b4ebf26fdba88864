//! Engine configuration.
//!
//! Defaults match the production tuning; every knob can be overridden with
//! a `DOTSYNC_*` environment variable. Call [`load_env`] first to layer a
//! `.env` file the standard dotenvy way.

use std::time::Duration;

use crate::error::ConfigError;

/// Tuning for polling, retry budgets, and the apply scheduler.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Poll interval while the batch is still being assembled/approved.
    pub preparation_interval: Duration,
    /// Poll interval once execution is underway.
    pub execution_interval: Duration,
    /// Every Nth preparation tick polls at the execution interval anyway,
    /// so a start observed late is picked up quickly.
    pub preparation_ticks_per_probe: u32,
    /// Consecutive failed polls before tracking stops.
    pub max_consecutive_failures: u32,
    /// Consecutive no-change polls before tracking stops.
    pub max_unchanged_polls: u32,
    /// Upper bound on how long an accepted update may wait for its apply.
    pub apply_ceiling: Duration,
    /// Idle window used to coalesce update bursts before applying.
    pub apply_idle_gap: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            preparation_interval: Duration::from_secs(2),
            execution_interval: Duration::from_secs(1),
            preparation_ticks_per_probe: 3,
            max_consecutive_failures: 5,
            max_unchanged_polls: 150,
            apply_ceiling: Duration::from_millis(100),
            apply_idle_gap: Duration::from_millis(10),
        }
    }
}

impl SyncConfig {
    /// Build from the environment, falling back to defaults per knob.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            preparation_interval: env_millis(
                "DOTSYNC_PREPARATION_INTERVAL_MS",
                defaults.preparation_interval,
            )?,
            execution_interval: env_millis(
                "DOTSYNC_EXECUTION_INTERVAL_MS",
                defaults.execution_interval,
            )?,
            preparation_ticks_per_probe: env_u32(
                "DOTSYNC_PREPARATION_TICKS_PER_PROBE",
                defaults.preparation_ticks_per_probe,
            )?,
            max_consecutive_failures: env_u32(
                "DOTSYNC_MAX_CONSECUTIVE_FAILURES",
                defaults.max_consecutive_failures,
            )?,
            max_unchanged_polls: env_u32(
                "DOTSYNC_MAX_UNCHANGED_POLLS",
                defaults.max_unchanged_polls,
            )?,
            apply_ceiling: env_millis("DOTSYNC_APPLY_CEILING_MS", defaults.apply_ceiling)?,
            apply_idle_gap: env_millis("DOTSYNC_APPLY_IDLE_GAP_MS", defaults.apply_idle_gap)?,
        })
    }
}

/// Load env vars from `.env` if present. Existing vars are never
/// overwritten, so explicit environment always wins.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

fn env_millis(key: &str, default: Duration) -> std::result::Result<Duration, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => {
            let ms: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected milliseconds, got {raw:?}"),
            })?;
            Ok(Duration::from_millis(ms))
        }
        Err(_) => Ok(default),
    }
}

fn env_u32(key: &str, default: u32) -> std::result::Result<u32, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected an integer, got {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}
