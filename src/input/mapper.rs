//! # Axis Mapper Module
//!
//! Maps bias-corrected gyro rates onto the three logical control channels.
//!
//! ## Channel Assignments
//!
//! | Channel | Default Axis | Default Invert | Scale |
//! |---------|--------------|----------------|-------|
//! | Horizontal (x) | Yaw | yes | `sensitivity` |
//! | Vertical (y) | Pitch | no | `sensitivity` |
//! | Roll | Roll | yes | `roll_sensitivity` |
//!
//! Several channels may read the same physical axis.
//!
//! ## Deadzone
//!
//! The deadzone is compared against the corrected rate *before* inversion and
//! scaling. A reading with `|rate| <= deadzone` produces exactly `0.0`;
//! anything above passes through as `rate * sign * sensitivity` with no
//! rescaling of the remaining range.
//!
//! ## Usage
//!
//! ```
//! use airmouse_bridge::input::mapper::{map_sample, AxisConfig};
//! use airmouse_bridge::protocol::GyroSample;
//!
//! let config = AxisConfig::default();
//! let out = map_sample(&GyroSample::new(0.0, 0.1, 0.0), &config);
//! assert_eq!(out.directional.y, 0.0); // inside the default 0.5 deadzone
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{AirMouseError, Result};
use crate::protocol::GyroSample;

/// Physical gyro axis a channel reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorAxis {
    Pitch,
    Roll,
    Yaw,
}

impl SensorAxis {
    /// Select this axis' rate from a sample.
    #[inline]
    #[must_use]
    pub fn select(self, sample: &GyroSample) -> f64 {
        match self {
            SensorAxis::Pitch => sample.pitch,
            SensorAxis::Roll => sample.roll,
            SensorAxis::Yaw => sample.yaw,
        }
    }
}

/// User-facing channel mapping and response settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AxisConfig {
    #[serde(default = "default_horizontal_axis")]
    pub horizontal_axis: SensorAxis,

    #[serde(default = "default_invert_horizontal")]
    pub invert_horizontal: bool,

    #[serde(default = "default_vertical_axis")]
    pub vertical_axis: SensorAxis,

    #[serde(default)]
    pub invert_vertical: bool,

    #[serde(default = "default_roll_axis")]
    pub roll_axis: SensorAxis,

    #[serde(default = "default_invert_roll")]
    pub invert_roll: bool,

    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,

    #[serde(default = "default_sensitivity")]
    pub roll_sensitivity: f32,

    #[serde(default = "default_deadzone")]
    pub deadzone: f32,

    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: f32,
}

pub(crate) fn default_horizontal_axis() -> SensorAxis { SensorAxis::Yaw }
pub(crate) fn default_invert_horizontal() -> bool { true }
pub(crate) fn default_vertical_axis() -> SensorAxis { SensorAxis::Pitch }
pub(crate) fn default_roll_axis() -> SensorAxis { SensorAxis::Roll }
pub(crate) fn default_invert_roll() -> bool { true }
pub(crate) fn default_sensitivity() -> f32 { 1.0 }
pub(crate) fn default_deadzone() -> f32 { 0.5 }
pub(crate) fn default_smoothing_factor() -> f32 { 0.15 }

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            horizontal_axis: default_horizontal_axis(),
            invert_horizontal: default_invert_horizontal(),
            vertical_axis: default_vertical_axis(),
            invert_vertical: false,
            roll_axis: default_roll_axis(),
            invert_roll: default_invert_roll(),
            sensitivity: default_sensitivity(),
            roll_sensitivity: default_sensitivity(),
            deadzone: default_deadzone(),
            smoothing_factor: default_smoothing_factor(),
        }
    }
}

impl AxisConfig {
    /// Check sensitivities, deadzone and smoothing factor
    ///
    /// # Errors
    ///
    /// Returns [`AirMouseError::InvalidAxisConfig`] if:
    /// - A sensitivity is not a positive finite number
    /// - `deadzone` is outside 0.0-5.0
    /// - `smoothing_factor` is outside 0.01-1.0
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("sensitivity", self.sensitivity),
            ("roll_sensitivity", self.roll_sensitivity),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AirMouseError::InvalidAxisConfig(format!(
                    "{} must be a positive number",
                    name
                )));
            }
        }

        // NaN fails both range checks
        if !(0.0..=5.0).contains(&self.deadzone) {
            return Err(AirMouseError::InvalidAxisConfig(
                "deadzone must be between 0.0 and 5.0".to_string(),
            ));
        }

        if !(0.01..=1.0).contains(&self.smoothing_factor) {
            return Err(AirMouseError::InvalidAxisConfig(
                "smoothing_factor must be between 0.01 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Two-component control vector (horizontal, vertical).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    /// Zero vector.
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One mapped, deadzoned and scaled sample, before smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct InputSample {
    /// Horizontal (x) and vertical (y) channels
    pub directional: Vector2,
    /// Roll channel
    pub roll: f32,
}

/// Map a single axis reading through deadzone, inversion and sensitivity.
///
/// # Examples
///
/// ```
/// use airmouse_bridge::input::mapper::map_axis;
///
/// assert_eq!(map_axis(0.1, 0.1, false, 5.0), 0.0);   // on the boundary
/// assert_eq!(map_axis(2.0, 0.1, true, 2.0), -4.0);
/// ```
#[inline]
#[must_use]
pub fn map_axis(value: f64, deadzone: f32, invert: bool, sensitivity: f32) -> f32 {
    if value.abs() <= f64::from(deadzone) {
        return 0.0;
    }

    let sign = if invert { -1.0 } else { 1.0 };
    (value * sign * f64::from(sensitivity)) as f32
}

/// Map a bias-corrected sample onto the control channels.
#[must_use]
pub fn map_sample(corrected: &GyroSample, config: &AxisConfig) -> InputSample {
    let horizontal = config.horizontal_axis.select(corrected);
    let vertical = config.vertical_axis.select(corrected);
    let roll = config.roll_axis.select(corrected);

    InputSample {
        directional: Vector2 {
            x: map_axis(horizontal, config.deadzone, config.invert_horizontal, config.sensitivity),
            y: map_axis(vertical, config.deadzone, config.invert_vertical, config.sensitivity),
        },
        roll: map_axis(roll, config.deadzone, config.invert_roll, config.roll_sensitivity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_config() -> AxisConfig {
        AxisConfig {
            horizontal_axis: SensorAxis::Yaw,
            invert_horizontal: false,
            vertical_axis: SensorAxis::Pitch,
            invert_vertical: false,
            roll_axis: SensorAxis::Roll,
            invert_roll: false,
            sensitivity: 1.0,
            roll_sensitivity: 1.0,
            deadzone: 0.1,
            smoothing_factor: 0.15,
        }
    }

    #[test]
    fn test_axis_config_validate() {
        assert!(AxisConfig::default().validate().is_ok());
        assert!(plain_config().validate().is_ok());

        let cases: [fn(&mut AxisConfig); 7] = [
            |c| c.smoothing_factor = f32::NAN,
            |c| c.smoothing_factor = 0.0,
            |c| c.deadzone = -0.1,
            |c| c.deadzone = f32::NAN,
            |c| c.sensitivity = f32::INFINITY,
            |c| c.sensitivity = 0.0,
            |c| c.roll_sensitivity = -1.0,
        ];
        for (i, edit) in cases.iter().enumerate() {
            let mut config = plain_config();
            edit(&mut config);
            assert!(
                matches!(config.validate(), Err(AirMouseError::InvalidAxisConfig(_))),
                "case {} should be rejected",
                i
            );
        }
    }

    #[test]
    fn test_axis_config_default() {
        let config = AxisConfig::default();
        assert_eq!(config.horizontal_axis, SensorAxis::Yaw);
        assert!(config.invert_horizontal);
        assert_eq!(config.vertical_axis, SensorAxis::Pitch);
        assert!(!config.invert_vertical);
        assert_eq!(config.roll_axis, SensorAxis::Roll);
        assert!(config.invert_roll);
        assert_eq!(config.deadzone, 0.5);
        assert_eq!(config.smoothing_factor, 0.15);
    }

    #[test]
    fn test_sensor_axis_select() {
        let sample = GyroSample::new(1.0, 2.0, 3.0);
        assert_eq!(SensorAxis::Roll.select(&sample), 1.0);
        assert_eq!(SensorAxis::Pitch.select(&sample), 2.0);
        assert_eq!(SensorAxis::Yaw.select(&sample), 3.0);
    }

    // ==================== Deadzone Tests ====================

    #[test]
    fn test_deadzone_forces_zero_regardless_of_sensitivity() {
        for &sensitivity in &[0.5f32, 1.0, 10.0, 1000.0] {
            for &value in &[0.0, 0.05, -0.05, 0.1, -0.1] {
                assert_eq!(map_axis(value, 0.1, false, sensitivity), 0.0);
                assert_eq!(map_axis(value, 0.1, true, sensitivity), 0.0);
            }
        }
    }

    #[test]
    fn test_outside_deadzone_is_linear() {
        for &value in &[0.2f64, -0.2, 1.0, -3.5, 42.0] {
            assert_eq!(map_axis(value, 0.1, false, 2.0), (value * 2.0) as f32);
            assert_eq!(map_axis(value, 0.1, true, 2.0), (value * -2.0) as f32);
        }
    }

    #[test]
    fn test_deadzone_uses_unscaled_value() {
        // 0.3 scaled by 10 would clear a 0.5 deadzone, the raw value does not
        assert_eq!(map_axis(0.3, 0.5, false, 10.0), 0.0);
        // 0.6 scaled by 0.1 is tiny, but the raw value clears the deadzone
        assert!((map_axis(0.6, 0.5, false, 0.1) - 0.06).abs() < 1e-6);
    }

    #[test]
    fn test_zero_deadzone_passes_small_values() {
        assert!((map_axis(0.001, 0.0, false, 1.0) - 0.001).abs() < 1e-9);
        assert_eq!(map_axis(0.0, 0.0, false, 1.0), 0.0);
    }

    // ==================== Sample Mapping Tests ====================

    #[test]
    fn test_map_sample_reference_scenario() {
        // raw (1.05, 2.00, -0.50) minus bias (0.05, 0.00, -0.50)
        let corrected = GyroSample::new(1.05 - 0.05, 2.00 - 0.00, -0.50 - (-0.50));
        let mut config = plain_config();
        config.horizontal_axis = SensorAxis::Yaw;
        config.vertical_axis = SensorAxis::Pitch;
        config.sensitivity = 2.0;

        let out = map_sample(&corrected, &config);
        assert_eq!(out.directional.x, 0.0);
        assert_eq!(out.directional.y, 4.0);
    }

    #[test]
    fn test_map_sample_uses_roll_sensitivity() {
        let mut config = plain_config();
        config.sensitivity = 1.0;
        config.roll_sensitivity = 3.0;

        let out = map_sample(&GyroSample::new(2.0, 0.0, 0.0), &config);
        assert_eq!(out.roll, 6.0);
        assert_eq!(out.directional, Vector2::ZERO);
    }

    #[test]
    fn test_map_sample_inversion_per_channel() {
        let mut config = plain_config();
        config.invert_horizontal = true;
        config.invert_roll = true;

        let out = map_sample(&GyroSample::new(1.0, 1.0, 1.0), &config);
        assert_eq!(out.directional.x, -1.0);
        assert_eq!(out.directional.y, 1.0);
        assert_eq!(out.roll, -1.0);
    }

    #[test]
    fn test_map_sample_aliased_axes() {
        let mut config = plain_config();
        config.horizontal_axis = SensorAxis::Pitch;
        config.vertical_axis = SensorAxis::Pitch;
        config.roll_axis = SensorAxis::Pitch;
        config.invert_vertical = true;

        let out = map_sample(&GyroSample::new(9.0, 2.0, 7.0), &config);
        assert_eq!(out.directional.x, 2.0);
        assert_eq!(out.directional.y, -2.0);
        assert_eq!(out.roll, 2.0);
    }

    #[test]
    fn test_sensor_axis_deserialize_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            axis: SensorAxis,
        }
        let w: Wrapper = toml::from_str("axis = \"yaw\"").unwrap();
        assert_eq!(w.axis, SensorAxis::Yaw);
        assert!(toml::from_str::<Wrapper>("axis = \"sideways\"").is_err());
    }
}
