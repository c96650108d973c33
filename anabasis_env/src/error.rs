//! Error types for the Anabasis environment abstraction.

use thiserror::Error;

/// Errors that can occur while constructing a tick source.
#[derive(Debug, Error, PartialEq)]
pub enum EnvError {
    /// Refresh rate must be positive and finite
    #[error("Invalid refresh rate: {0} Hz")]
    InvalidRefreshRate(f64),

    /// Jitter is a fraction of the refresh period in [0, 1)
    #[error("Invalid frame jitter: {0}")]
    InvalidJitter(f64),
}

impl EnvError {
    /// Checks a refresh rate and returns the matching frame period in seconds.
    pub fn check_refresh_rate(hz: f64) -> Result<f64, Self> {
        if hz.is_finite() && hz > 0.0 {
            Ok(1.0 / hz)
        } else {
            Err(Self::InvalidRefreshRate(hz))
        }
    }
}
