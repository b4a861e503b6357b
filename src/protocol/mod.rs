//! # Air Mouse Line Protocol
//!
//! Text protocol spoken by the Air Mouse firmware over USB serial.
//!
//! This module handles:
//! - Telemetry line decoding (7 comma-separated fields, gyro rates at 3..=5)
//! - Vibration command encoding (`V,<intensity>,<durationMs>\n`)
//! - Validation and clamping of outbound commands

pub mod decoder;
pub mod encoder;

/// Field separator on the wire
pub const FIELD_SEPARATOR: char = ',';

/// Number of fields in a telemetry line
pub const TELEMETRY_FIELD_COUNT: usize = 7;

/// Field index of the roll angular rate
pub const ROLL_RATE_FIELD: usize = 3;

/// Field index of the pitch angular rate
pub const PITCH_RATE_FIELD: usize = 4;

/// Field index of the yaw angular rate
pub const YAW_RATE_FIELD: usize = 5;

/// Command tag for vibration commands
pub const VIBRATION_COMMAND_TAG: &str = "V";

/// Maximum vibration motor intensity
pub const MAX_VIBRATION_INTENSITY: u8 = u8::MAX;

/// Raw angular rates of one telemetry line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GyroSample {
    /// Roll rate
    pub roll: f64,
    /// Pitch rate
    pub pitch: f64,
    /// Yaw rate
    pub yaw: f64,
}

impl GyroSample {
    /// Create a sample from its three rates
    #[must_use]
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }
}

/// A validated haptic command for the device.
///
/// Construction clamps the intensity into the motor's 0-255 range and rejects
/// non-positive durations, so every value of this type is safe to transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VibrationCommand {
    intensity: u8,
    duration_ms: u32,
}

impl VibrationCommand {
    /// Create a command, clamping intensity to 0-255.
    ///
    /// Returns `None` when `duration_ms` is zero or negative.
    ///
    /// # Examples
    ///
    /// ```
    /// use airmouse_bridge::protocol::VibrationCommand;
    ///
    /// let cmd = VibrationCommand::new(300, 100).unwrap();
    /// assert_eq!(cmd.intensity(), 255);
    /// assert!(VibrationCommand::new(100, 0).is_none());
    /// ```
    #[must_use]
    pub fn new(intensity: i32, duration_ms: i32) -> Option<Self> {
        if duration_ms <= 0 {
            return None;
        }

        let intensity = intensity.clamp(0, i32::from(MAX_VIBRATION_INTENSITY)) as u8;

        Some(Self {
            intensity,
            duration_ms: duration_ms as u32,
        })
    }

    /// Motor intensity (0-255)
    #[must_use]
    pub fn intensity(&self) -> u8 {
        self.intensity
    }

    /// Pulse duration in milliseconds
    #[must_use]
    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }
}
