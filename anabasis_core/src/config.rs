//! Engine configuration.
//!
//! Every tunable the animation driver and the speed control read lives here,
//! loadable from JSON with missing fields taking their defaults.

use crate::dataset::TransportMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Fallback base speed must be positive, got {0} m/s")]
    NonPositiveFallbackSpeed(f64),

    #[error("Transport multiplier for {mode} must be positive, got {value}")]
    NonPositiveMultiplier { mode: TransportMode, value: f64 },

    #[error("Invalid speed range: min {min}, max {max}, step {step}")]
    InvalidSpeedRange { min: f64, max: f64, step: f64 },

    #[error("Arrival tolerance must be non-negative, got {0} m")]
    NegativeTolerance(f64),

    #[error("Invalid refresh rate: {0} Hz")]
    InvalidRefreshRate(f64),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

// ============================================================================
// TRANSPORT SPEEDS
// ============================================================================

/// Speed multiplier applied per transport mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSpeeds {
    pub foot: f64,
    pub horse: f64,
    pub ship: f64,
    pub supply: f64,
}

impl Default for TransportSpeeds {
    fn default() -> Self {
        Self {
            foot: 0.7,
            horse: 1.0,
            ship: 1.3,
            supply: 0.5,
        }
    }
}

impl TransportSpeeds {
    pub fn multiplier(&self, mode: TransportMode) -> f64 {
        match mode {
            TransportMode::Foot => self.foot,
            TransportMode::Horse => self.horse,
            TransportMode::Ship => self.ship,
            TransportMode::Supply => self.supply,
        }
    }
}

// ============================================================================
// ENGINE CONFIG
// ============================================================================

/// Configuration for the animation driver and playback controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base speed when a segment has no usable duration (default: 20 m/s)
    pub fallback_speed_mps: f64,

    /// Per-mode multipliers (default: foot 0.7, horse 1.0, ship 1.3, supply 0.5)
    pub transport_speeds: TransportSpeeds,

    /// Slowest selectable playback speed (default: 0.5×)
    pub min_speed: f64,

    /// Fastest selectable playback speed (default: 4×)
    pub max_speed: f64,

    /// Speed control increment (default: 0.25)
    pub speed_step: f64,

    /// Distance short of the end that already counts as arrival (default: 1 mm)
    pub arrival_tolerance_m: f64,

    /// Nominal display refresh (default: 60 Hz)
    pub refresh_hz: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_speed_mps: 20.0,
            transport_speeds: TransportSpeeds::default(),
            min_speed: 0.5,
            max_speed: 4.0,
            speed_step: 0.25,
            arrival_tolerance_m: 0.001,
            refresh_hz: 60.0,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON config. Absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.fallback_speed_mps) {
            return Err(ConfigError::NonPositiveFallbackSpeed(self.fallback_speed_mps));
        }

        for mode in TransportMode::all() {
            let value = self.transport_speeds.multiplier(mode);
            if !positive(value) {
                return Err(ConfigError::NonPositiveMultiplier { mode, value });
            }
        }

        if !positive(self.min_speed)
            || !positive(self.speed_step)
            || !self.max_speed.is_finite()
            || self.max_speed < self.min_speed
        {
            return Err(ConfigError::InvalidSpeedRange {
                min: self.min_speed,
                max: self.max_speed,
                step: self.speed_step,
            });
        }

        if self.arrival_tolerance_m.is_nan() || self.arrival_tolerance_m < 0.0 {
            return Err(ConfigError::NegativeTolerance(self.arrival_tolerance_m));
        }

        if !positive(self.refresh_hz) {
            return Err(ConfigError::InvalidRefreshRate(self.refresh_hz));
        }

        Ok(())
    }

    /// Snaps `speed` to the selectable range and step grid.
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        if speed.is_nan() {
            return self.min_speed;
        }
        let steps = ((speed - self.min_speed) / self.speed_step).round();
        (self.min_speed + steps * self.speed_step).clamp(self.min_speed, self.max_speed)
    }

    /// Moves `speed` by `steps` increments, staying in range.
    pub fn step_speed(&self, speed: f64, steps: i32) -> f64 {
        self.clamp_speed(speed + f64::from(steps) * self.speed_step)
    }
}
