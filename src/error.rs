//! # Error Types
//!
//! Custom error types for AirMouse Bridge using `thiserror`.
//!
//! Only [`AirMouseError::OpenFailure`] and [`AirMouseError::CalibrationTimeout`]
//! end a connection attempt. The remaining I/O variants are handled inside the
//! connection task and never reach the consumer.

use thiserror::Error;

/// Main error type for AirMouse Bridge
#[derive(Debug, Error)]
pub enum AirMouseError {
    /// Serial device could not be opened (wrong port, busy, permissions)
    #[error("Failed to open serial port {port}: {reason}")]
    OpenFailure { port: String, reason: String },

    /// Calibration window closed before enough samples arrived
    #[error("Calibration failed: received only {collected}/{required} samples")]
    CalibrationTimeout { collected: usize, required: usize },

    /// Connection attempt was stopped before it finished
    #[error("Connection attempt cancelled")]
    Cancelled,

    /// No line arrived within the read timeout
    #[error("Read timed out")]
    ReadTimeout,

    /// Line with the wrong field count or a non-numeric field
    #[error("Malformed line: {0}")]
    MalformedLine(String),

    /// Outbound command could not be written
    #[error("Write failed: {0}")]
    WriteFailure(String),

    /// Axis setting out of range
    #[error("Invalid axis setting: {0}")]
    InvalidAxisConfig(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Telemetry serialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for AirMouse Bridge
pub type Result<T> = std::result::Result<T, AirMouseError>;
