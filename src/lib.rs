//! # AirMouse Bridge Library
//!
//! Use a gyroscope "air mouse" on a serial port as a pointing device.
//!
//! This library provides the input pipeline: it reads the device's telemetry
//! lines, removes the zero-rate bias measured at connect time, maps the
//! angular rates onto directional and roll channels and smooths them on the
//! host's tick. Vibration commands travel the other way.

pub mod airmouse;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod haptics;
pub mod input;
pub mod protocol;
pub mod serial;
pub mod telemetry;
