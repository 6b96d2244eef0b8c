//! Scheduler configuration (cadence.toml)

use crate::easing::CubicBezier;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Lowest accepted frame rate
pub const MIN_FPS: u32 = 1;
/// Highest accepted frame rate
pub const MAX_FPS: u32 = 240;

/// Top-level scheduler configuration
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Target frame rate for the timer-driven loop, clamped to [1, 240]
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Per-step clamp used by `tick_once()`; 0 disables clamping
    #[serde(default)]
    pub max_manual_step_ms: u32,
    /// Values a freshly staged run starts from
    #[serde(default)]
    pub defaults: RunDefaults,
}

fn default_fps() -> u32 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            max_manual_step_ms: 0,
            defaults: RunDefaults::default(),
        }
    }
}

impl SchedulerConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SchedulerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject values that would make runs misbehave.
    ///
    /// Out-of-range frame rates are not errors; they are clamped when applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.defaults.easing.is_well_formed() {
            return Err(ConfigError::Invalid {
                field: "defaults.easing",
                reason: format!(
                    "expected finite coordinates with x1, x2 in [0, 1], got {:?}",
                    <[f64; 4]>::from(self.defaults.easing)
                ),
            });
        }
        Ok(())
    }

    /// Frame rate after clamping to the supported range
    pub fn clamped_fps(&self) -> u32 {
        self.fps.clamp(MIN_FPS, MAX_FPS)
    }
}

/// Staging defaults for new runs
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunDefaults {
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u32,
    #[serde(default)]
    pub delay_ms: u32,
    /// Number of legs; negative means infinite
    #[serde(default = "default_loop_count")]
    pub loop_count: i32,
    #[serde(default)]
    pub yoyo: bool,
    #[serde(default)]
    pub easing: CubicBezier,
}

fn default_duration_ms() -> u32 {
    400
}

fn default_loop_count() -> i32 {
    1
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            delay_ms: 0,
            loop_count: default_loop_count(),
            yoyo: false,
            easing: CubicBezier::default(),
        }
    }
}
