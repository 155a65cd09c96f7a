//! # Display Configuration
//!
//! Loaded once at startup (TOML), or built in code via `Default` plus
//! struct update syntax. Validation happens at controller construction and
//! at parse time; a running display never re-reads its configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DisplayError, DisplayResult};
use crate::interrupt::DispatchMode;
use crate::pacer::PacingStrategy;
use crate::{DEFAULT_HEIGHT, DEFAULT_REFRESH_HZ, DEFAULT_WIDTH};

/// Static configuration for one display instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DisplayConfig {
    /// Screen width in pixels.
    pub width: u32,
    /// Screen height in pixels.
    pub height: u32,
    /// Target refresh rate in Hz.
    pub refresh_hz: u32,
    /// How the pacer schedules frame pulses.
    pub pacing: PacingStrategy,
    /// How interrupt listeners are invoked.
    pub dispatch: DispatchMode,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            refresh_hz: DEFAULT_REFRESH_HZ,
            pacing: PacingStrategy::default(),
            dispatch: DispatchMode::default(),
        }
    }
}

impl DisplayConfig {
    /// Parses and validates a TOML document.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::InvalidConfig`] on parse failure, or the
    /// relevant validation error afterwards.
    pub fn from_toml_str(text: &str) -> DisplayResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|err| DisplayError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks dimensions and refresh rate.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::InvalidDimensions`] or
    /// [`DisplayError::InvalidRefreshRate`].
    pub fn validate(&self) -> DisplayResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(DisplayError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.refresh_hz == 0 {
            return Err(DisplayError::InvalidRefreshRate(self.refresh_hz));
        }
        Ok(())
    }

    /// Duration of one frame at the configured refresh rate.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.refresh_hz))
    }
}
