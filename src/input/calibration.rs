//! # Calibration Module
//!
//! Zero-rate bias estimation for the gyroscope.
//!
//! MEMS gyros report a small, locally constant rate while perfectly still.
//! At the start of every connection attempt the device is held still while a
//! fixed window of samples is averaged; the per-axis mean becomes the bias
//! that is subtracted from every streamed sample afterwards.
//!
//! The window must fill within a wall-clock deadline. The deadline is checked
//! between reads, so a blocking read may overshoot it by up to one read
//! timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::error::{AirMouseError, Result};
use crate::protocol::decoder::decode_line;
use crate::protocol::GyroSample;
use crate::serial::port_trait::SerialDevice;
use crate::serial::{read_device_line, READ_ERROR_BACKOFF};

/// Calibration window settings
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CalibrationConfig {
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,

    #[serde(default = "default_calibration_timeout_ms")]
    pub timeout_ms: u64,
}

pub(crate) fn default_sample_count() -> usize { 150 }
pub(crate) fn default_calibration_timeout_ms() -> u64 { 8000 }

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            timeout_ms: default_calibration_timeout_ms(),
        }
    }
}

/// Per-axis zero-rate offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GyroBias {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl GyroBias {
    /// Subtract the bias from a raw sample.
    #[inline]
    #[must_use]
    pub fn correct(&self, raw: &GyroSample) -> GyroSample {
        GyroSample {
            roll: raw.roll - self.roll,
            pitch: raw.pitch - self.pitch,
            yaw: raw.yaw - self.yaw,
        }
    }
}

/// Running sum of calibration samples.
#[derive(Debug, Clone, Default)]
pub struct BiasAccumulator {
    sum: GyroSample,
    count: usize,
}

impl BiasAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one raw sample to the window.
    pub fn add(&mut self, sample: &GyroSample) {
        self.sum.roll += sample.roll;
        self.sum.pitch += sample.pitch;
        self.sum.yaw += sample.yaw;
        self.count += 1;
    }

    /// Number of samples collected so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Arithmetic mean per axis, or `None` if the window is empty.
    #[must_use]
    pub fn mean(&self) -> Option<GyroBias> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(GyroBias {
            roll: self.sum.roll / n,
            pitch: self.sum.pitch / n,
            yaw: self.sum.yaw / n,
        })
    }
}

/// Collect the calibration window from `device` and compute the bias
///
/// Read timeouts, read errors and malformed lines are skipped; none of them
/// count toward the window.
///
/// # Arguments
///
/// * `device` - Open serial device
/// * `config` - Window size and deadline
/// * `read_timeout` - Timeout for each line read
/// * `stop` - Cooperative stop flag, checked between reads
///
/// # Errors
///
/// - [`AirMouseError::CalibrationTimeout`] if the window did not fill in time
/// - [`AirMouseError::Cancelled`] if `stop` was raised
pub async fn calibrate(
    device: &mut dyn SerialDevice,
    config: &CalibrationConfig,
    read_timeout: Duration,
    stop: &AtomicBool,
) -> Result<GyroBias> {
    info!("Calibrating gyro: keep the sensor perfectly still");

    let deadline = Instant::now() + Duration::from_millis(config.timeout_ms);
    let mut accumulator = BiasAccumulator::new();

    while accumulator.count() < config.sample_count && Instant::now() < deadline {
        if stop.load(Ordering::Acquire) {
            return Err(AirMouseError::Cancelled);
        }

        match read_device_line(device, read_timeout).await {
            Ok(line) => match decode_line(&line) {
                Ok(sample) => accumulator.add(&sample),
                Err(e) => trace!("Skipping calibration line: {}", e),
            },
            Err(AirMouseError::ReadTimeout) => {}
            Err(e) => {
                debug!("Read error during calibration: {}", e);
                tokio::time::sleep(READ_ERROR_BACKOFF).await;
            }
        }
    }

    if accumulator.count() < config.sample_count {
        warn!(
            "Calibration failed: received only {}/{} samples",
            accumulator.count(),
            config.sample_count
        );
        return Err(AirMouseError::CalibrationTimeout {
            collected: accumulator.count(),
            required: config.sample_count,
        });
    }

    let bias = accumulator.mean().ok_or(AirMouseError::CalibrationTimeout {
        collected: 0,
        required: config.sample_count,
    })?;

    info!(
        "Calibration complete (bias roll={:.4}, pitch={:.4}, yaw={:.4})",
        bias.roll, bias.pitch, bias.yaw
    );
    Ok(bias)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::port_trait::mocks::ScriptedDevice;

    const READ_TIMEOUT: Duration = Duration::from_millis(500);

    fn line(roll: f64, pitch: f64, yaw: f64) -> String {
        format!("0,0,0,{},{},{},0", roll, pitch, yaw)
    }

    // ==================== Accumulator Tests ====================

    #[test]
    fn test_accumulator_empty_has_no_mean() {
        assert!(BiasAccumulator::new().mean().is_none());
    }

    #[test]
    fn test_accumulator_mean() {
        let mut acc = BiasAccumulator::new();
        acc.add(&GyroSample::new(1.0, 10.0, -2.0));
        acc.add(&GyroSample::new(3.0, 20.0, -4.0));
        let bias = acc.mean().unwrap();
        assert_eq!(bias, GyroBias { roll: 2.0, pitch: 15.0, yaw: -3.0 });
    }

    #[test]
    fn test_accumulator_mean_is_order_independent() {
        let samples: Vec<GyroSample> = (0..150)
            .map(|i| GyroSample::new(i as f64 * 0.01, 1.0 - i as f64 * 0.02, (i % 7) as f64))
            .collect();

        let mut forward = BiasAccumulator::new();
        samples.iter().for_each(|s| forward.add(s));

        let mut reversed = BiasAccumulator::new();
        samples.iter().rev().for_each(|s| reversed.add(s));

        let a = forward.mean().unwrap();
        let b = reversed.mean().unwrap();
        assert!((a.roll - b.roll).abs() < 1e-12);
        assert!((a.pitch - b.pitch).abs() < 1e-12);
        assert!((a.yaw - b.yaw).abs() < 1e-12);

        let expected_roll = samples.iter().map(|s| s.roll).sum::<f64>() / 150.0;
        assert!((a.roll - expected_roll).abs() < 1e-12);
    }

    #[test]
    fn test_bias_correct() {
        let bias = GyroBias { roll: 0.05, pitch: 0.0, yaw: -0.5 };
        let corrected = bias.correct(&GyroSample::new(1.05, 2.0, -0.5));
        assert!((corrected.roll - 1.0).abs() < 1e-12);
        assert_eq!(corrected.pitch, 2.0);
        assert_eq!(corrected.yaw, 0.0);
    }

    #[test]
    fn test_calibration_config_default() {
        let config = CalibrationConfig::default();
        assert_eq!(config.sample_count, 150);
        assert_eq!(config.timeout_ms, 8000);
    }

    // ==================== Calibration Procedure Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_calibrate_with_full_window() {
        let mut device = ScriptedDevice::new();
        for i in 0..150 {
            let v = if i % 2 == 0 { 1.0 } else { 3.0 };
            device.push_line(&line(v, -v, 0.5));
        }

        let stop = AtomicBool::new(false);
        let bias = calibrate(&mut device, &CalibrationConfig::default(), READ_TIMEOUT, &stop)
            .await
            .unwrap();

        assert!((bias.roll - 2.0).abs() < 1e-12);
        assert!((bias.pitch + 2.0).abs() < 1e-12);
        assert!((bias.yaw - 0.5).abs() < 1e-12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calibrate_skips_malformed_lines() {
        let mut device = ScriptedDevice::new();
        for _ in 0..150 {
            device.push_line("garbage");
            device.push_line("1,2,3");
            device.push_line(&line(1.0, 1.0, 1.0));
        }

        let stop = AtomicBool::new(false);
        let bias = calibrate(&mut device, &CalibrationConfig::default(), READ_TIMEOUT, &stop)
            .await
            .unwrap();

        assert_eq!(bias, GyroBias { roll: 1.0, pitch: 1.0, yaw: 1.0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_calibrate_stops_reading_once_window_is_full() {
        let mut device = ScriptedDevice::new();
        for _ in 0..150 {
            device.push_line(&line(0.0, 0.0, 0.0));
        }
        device.push_line(&line(100.0, 100.0, 100.0));

        let stop = AtomicBool::new(false);
        let bias = calibrate(&mut device, &CalibrationConfig::default(), READ_TIMEOUT, &stop)
            .await
            .unwrap();

        assert_eq!(bias, GyroBias::default());
        assert_eq!(device.pending_lines(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calibrate_times_out_with_too_few_samples() {
        let mut device = ScriptedDevice::new();
        for _ in 0..149 {
            device.push_line(&line(0.0, 0.0, 0.0));
        }

        let stop = AtomicBool::new(false);
        let started = Instant::now();
        let result =
            calibrate(&mut device, &CalibrationConfig::default(), READ_TIMEOUT, &stop).await;

        match result {
            Err(AirMouseError::CalibrationTimeout { collected, required }) => {
                assert_eq!(collected, 149);
                assert_eq!(required, 150);
            }
            other => panic!("Expected CalibrationTimeout, got: {:?}", other),
        }

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(8000));
        assert!(elapsed <= Duration::from_millis(8000) + READ_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calibrate_malformed_lines_do_not_count() {
        let mut device = ScriptedDevice::new();
        for _ in 0..300 {
            device.push_line("0,0,0,1,2,3");
        }

        let stop = AtomicBool::new(false);
        let result =
            calibrate(&mut device, &CalibrationConfig::default(), READ_TIMEOUT, &stop).await;

        assert!(matches!(
            result,
            Err(AirMouseError::CalibrationTimeout { collected: 0, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_calibrate_observes_stop_flag() {
        let mut device = ScriptedDevice::new();
        let stop = AtomicBool::new(true);

        let result =
            calibrate(&mut device, &CalibrationConfig::default(), READ_TIMEOUT, &stop).await;
        assert!(matches!(result, Err(AirMouseError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_calibrate_read_errors_end_in_timeout() {
        let mut device = ScriptedDevice::new();
        device.set_read_error(std::io::ErrorKind::BrokenPipe);

        let stop = AtomicBool::new(false);
        let result =
            calibrate(&mut device, &CalibrationConfig::default(), READ_TIMEOUT, &stop).await;
        assert!(matches!(
            result,
            Err(AirMouseError::CalibrationTimeout { collected: 0, required: 150 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_calibrate_non_finite_lines_do_not_count() {
        let mut device = ScriptedDevice::new();
        device.push_line("0,0,0,nan,0,0,0");
        device.push_line("0,0,0,0,inf,0,0");
        for v in [1.0, 3.0] {
            device.push_line(&line(v, v, v));
        }

        let config = CalibrationConfig { sample_count: 2, timeout_ms: 1000 };
        let stop = AtomicBool::new(false);
        let bias = calibrate(&mut device, &config, READ_TIMEOUT, &stop).await.unwrap();

        assert_eq!(bias, GyroBias { roll: 2.0, pitch: 2.0, yaw: 2.0 });
        assert!(bias.roll.is_finite() && bias.pitch.is_finite() && bias.yaw.is_finite());
    }

    #[tokio::test(start_paused = true)]
    async fn test_calibrate_custom_window() {
        let mut device = ScriptedDevice::new();
        for v in [1.0, 2.0, 3.0, 4.0] {
            device.push_line(&line(v, v, v));
        }

        let config = CalibrationConfig { sample_count: 4, timeout_ms: 1000 };
        let stop = AtomicBool::new(false);
        let bias = calibrate(&mut device, &config, READ_TIMEOUT, &stop).await.unwrap();
        assert_eq!(bias, GyroBias { roll: 2.5, pitch: 2.5, yaw: 2.5 });
    }
}
