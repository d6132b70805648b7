//! Configuration values for the engines.
//!
//! Always passed in explicitly; nothing here is read from the environment or
//! cached globally.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("alpha must be in (0, 1), got {0}")]
    InvalidAlpha(f64),

    #[error("required_sample_size must be at least 1")]
    ZeroSampleSize,

    #[error("tick_interval_ms must be at least 1")]
    ZeroTickInterval,
}

/// Thresholds of the sample comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// p-values below this reject "no difference".
    #[serde(default = "ComparisonConfig::default_alpha")]
    pub alpha: f64,

    /// Below this many values per sample, a non-significant result is
    /// NEED_MORE_DATA instead of FAIL_TO_REJECT.
    #[serde(default = "ComparisonConfig::default_required_sample_size")]
    pub required_sample_size: usize,
}

impl ComparisonConfig {
    pub const DEFAULT_ALPHA: f64 = 0.01;
    pub const DEFAULT_REQUIRED_SAMPLE_SIZE: usize = 20;

    fn default_alpha() -> f64 {
        Self::DEFAULT_ALPHA
    }

    fn default_required_sample_size() -> usize {
        Self::DEFAULT_REQUIRED_SAMPLE_SIZE
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ConfigError::InvalidAlpha(self.alpha));
        }
        if self.required_sample_size == 0 {
            return Err(ConfigError::ZeroSampleSize);
        }
        Ok(())
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            alpha: Self::DEFAULT_ALPHA,
            required_sample_size: Self::DEFAULT_REQUIRED_SAMPLE_SIZE,
        }
    }
}

/// How the scheduler drives its Attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "SchedulerConfig::default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Give up after this many ticks (None: run until every Attempt completes).
    #[serde(default)]
    pub max_ticks: Option<u64>,
}

impl SchedulerConfig {
    fn default_tick_interval_ms() -> u64 {
        1000
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: Self::default_tick_interval_ms(),
            max_ticks: None,
        }
    }
}
