//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{AirMouseError, Result};
use crate::haptics::HapticsConfig;
use crate::input::calibration::CalibrationConfig;
use crate::input::mapper::AxisConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub axes: AxisConfig,
    #[serde(default)]
    pub haptics: HapticsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            settle_ms: default_settle_ms(),
            join_timeout_ms: default_join_timeout_ms(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            format: default_log_format(),
        }
    }
}

/// Host loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HostConfig {
    #[serde(default = "default_update_rate_hz")]
    pub update_rate_hz: u32,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_raw_history_lines")]
    pub raw_history_lines: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            update_rate_hz: default_update_rate_hz(),
            connect_timeout_ms: default_connect_timeout_ms(),
            raw_history_lines: default_raw_history_lines(),
        }
    }
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; console only when unset
    #[serde(default)]
    pub file_dir: Option<String>,
}

/// Baud rates accepted by the Air Mouse firmware
pub const SUPPORTED_BAUD_RATES: [u32; 8] = [9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600];

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_read_timeout_ms() -> u64 { 500 }
fn default_settle_ms() -> u64 { 2000 }
fn default_join_timeout_ms() -> u64 { 500 }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_format() -> String { "jsonl".to_string() }

fn default_update_rate_hz() -> u32 { 60 }
fn default_connect_timeout_ms() -> u64 { 12000 }
fn default_raw_history_lines() -> usize { 10 }

fn invalid(msg: impl std::fmt::Display) -> AirMouseError {
    AirMouseError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing sections and fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use airmouse_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Serial
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {}",
                SUPPORTED_BAUD_RATES
                    .iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        if self.serial.read_timeout_ms == 0 || self.serial.read_timeout_ms > 10000 {
            return Err(invalid("read_timeout_ms must be between 1 and 10000"));
        }

        if self.serial.settle_ms > 10000 {
            return Err(invalid("settle_ms must be between 0 and 10000"));
        }

        if self.serial.join_timeout_ms == 0 || self.serial.join_timeout_ms > 10000 {
            return Err(invalid("join_timeout_ms must be between 1 and 10000"));
        }

        // Calibration
        if self.calibration.sample_count == 0 {
            return Err(invalid("calibration sample_count must be greater than 0"));
        }

        if self.calibration.timeout_ms == 0 || self.calibration.timeout_ms > 60000 {
            return Err(invalid("calibration timeout_ms must be between 1 and 60000"));
        }

        // Axes
        self.axes.validate()?;

        // Haptics
        for (name, value) in [
            ("pickup_intensity", self.haptics.pickup_intensity),
            ("success_intensity", self.haptics.success_intensity),
        ] {
            if !(0..=255).contains(&value) {
                return Err(invalid(format!("{} must be between 0 and 255", name)));
            }
        }

        if self.haptics.pickup_duration_ms <= 0 || self.haptics.success_pulse_ms <= 0 {
            return Err(invalid("haptic pulse durations must be greater than 0"));
        }

        // Telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        // Host
        if self.host.update_rate_hz == 0 || self.host.update_rate_hz > 1000 {
            return Err(invalid("update_rate_hz must be between 1 and 1000"));
        }

        if self.host.connect_timeout_ms == 0 {
            return Err(invalid("connect_timeout_ms must be greater than 0"));
        }

        if self.host.raw_history_lines == 0 {
            return Err(invalid("raw_history_lines must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::mapper::SensorAxis;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_ok!(config.validate());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "COM4"

[calibration]

[axes]
horizontal_axis = "roll"
invert_horizontal = false
deadzone = 0.25

[telemetry]

[host]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = assert_ok!(Config::load(temp_file.path()));
        assert_eq!(config.serial.port, "COM4");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.axes.horizontal_axis, SensorAxis::Roll);
        assert!(!config.axes.invert_horizontal);
        assert_eq!(config.axes.deadzone, 0.25);
        assert_eq!(config.axes.vertical_axis, SensorAxis::Pitch);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.calibration.sample_count, 150);
        assert_eq!(config.axes.smoothing_factor, 0.15);
        assert!(!config.telemetry.enabled);
        assert!(config.logging.file_dir.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/airmouse.toml");
        assert!(matches!(result, Err(AirMouseError::Io(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let err = assert_err!(Config::from_toml_str("[serial\nport = "));
        assert!(matches!(err, AirMouseError::Config(_)));
    }

    #[test]
    fn test_unknown_axis_name() {
        assert!(Config::from_toml_str("[axes]\nroll_axis = \"spin\"").is_err());
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = Config::default();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &SUPPORTED_BAUD_RATES {
            let mut config = Config::default();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_read_timeout_bounds() {
        let mut config = Config::default();
        config.serial.read_timeout_ms = 0;
        assert!(config.validate().is_err());
        config.serial.read_timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settle_bounds() {
        let mut config = Config::default();
        config.serial.settle_ms = 0;
        assert!(config.validate().is_ok());
        config.serial.settle_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_join_timeout_zero() {
        let mut config = Config::default();
        config.serial.join_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_calibration_sample_count_zero() {
        let mut config = Config::default();
        config.calibration.sample_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_calibration_timeout_bounds() {
        let mut config = Config::default();
        config.calibration.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.calibration.timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_sensitivity() {
        let mut config = Config::default();
        config.axes.sensitivity = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.axes.roll_sensitivity = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.axes.sensitivity = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deadzone_range() {
        let mut config = Config::default();
        config.axes.deadzone = -0.1;
        assert!(config.validate().is_err());
        config.axes.deadzone = 5.1;
        assert!(config.validate().is_err());
        config.axes.deadzone = 5.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_smoothing_factor_range() {
        let mut config = Config::default();
        config.axes.smoothing_factor = 0.0;
        assert!(config.validate().is_err());
        config.axes.smoothing_factor = 1.1;
        assert!(config.validate().is_err());
        config.axes.smoothing_factor = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_haptic_intensity_range() {
        let mut config = Config::default();
        config.haptics.pickup_intensity = 256;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_haptic_duration_zero() {
        let mut config = Config::default();
        config.haptics.success_pulse_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = Config::default();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = Config::default();
        config.telemetry.enabled = false;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = Config::default();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = Config::default();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = Config::default();
        config.telemetry.format = "csv".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_update_rate_bounds() {
        let mut config = Config::default();
        config.host.update_rate_hz = 0;
        assert!(config.validate().is_err());
        config.host.update_rate_hz = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_raw_history_lines_zero() {
        let mut config = Config::default();
        config.host.raw_history_lines = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyUSB0");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_read_timeout_ms(), 500);
        assert_eq!(default_settle_ms(), 2000);
        assert_eq!(default_join_timeout_ms(), 500);
        assert_eq!(default_log_dir(), "./logs");
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
        assert_eq!(default_log_format(), "jsonl");
        assert_eq!(default_update_rate_hz(), 60);
        assert_eq!(default_connect_timeout_ms(), 12000);
        assert_eq!(default_raw_history_lines(), 10);
    }
}
