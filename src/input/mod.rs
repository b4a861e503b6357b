//! # Input Module
//!
//! Gyro sample processing between the wire and the host application.
//!
//! This module handles:
//! - Zero-rate bias calibration
//! - Mapping corrected rates to horizontal, vertical and roll channels
//! - The lock-guarded latest-sample slot shared with the consumer
//! - Exponential smoothing on the consumer's tick

pub mod calibration;
pub mod mapper;
pub mod smoothing;
pub mod store;
