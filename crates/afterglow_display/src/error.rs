//! # Display Error Types
//!
//! Construction and configuration are the only fallible surfaces in this
//! crate. The render path itself has no checked errors: thread-wake hiccups
//! are retried locally and never surfaced.

use thiserror::Error;

/// Errors that can occur while building or configuring a display.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    /// Screen dimensions must both be nonzero.
    #[error("invalid screen dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// Refresh rate must be nonzero.
    #[error("invalid refresh rate: {0}Hz")]
    InvalidRefreshRate(u32),

    /// Configuration file could not be parsed or failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for display operations.
pub type DisplayResult<T> = Result<T, DisplayError>;
