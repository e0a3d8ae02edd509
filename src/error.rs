//! # Error Types
//!
//! Custom error types for Joydrive using `thiserror`.
//!
//! None of the control-path variants are fatal. `SensorFault`,
//! `CalibrationDegraded` and `InvalidCalibrationRange` are recovered locally
//! and surface only as diagnostics; the remaining variants belong to the host
//! binary (configuration, devices, telemetry files).

use thiserror::Error;

use crate::joystick::source::Axis;

/// Main error type for Joydrive
#[derive(Debug, Error)]
pub enum JoydriveError {
    /// Sample outside the ADC bounds or a failed read
    #[error("sensor fault on {axis} axis: {reason}")]
    SensorFault { axis: Axis, reason: String },

    /// Calibration finished with less data than required
    #[error("calibration degraded on {axis} axis: {reason}")]
    CalibrationDegraded { axis: Axis, reason: String },

    /// Profile bounds that cannot be mapped (inverted or collapsed)
    #[error("invalid calibration range: min={min} center={center} max={max}")]
    InvalidCalibrationRange { min: i32, center: i32, max: i32 },

    /// No usable input device was found
    #[error("input device not found: {0}")]
    DeviceNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Telemetry serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Joydrive
pub type Result<T> = std::result::Result<T, JoydriveError>;
