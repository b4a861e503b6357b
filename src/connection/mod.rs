//! # Connection Module
//!
//! Lifecycle of one Air Mouse connection attempt.
//!
//! ```text
//!                activate
//! Disconnected ───────────► Connecting ──► Connected
//!       ▲                        │              │
//!       │       deactivate       ▼              │
//!       └────────────────────  Failed ◄─────────┘ (never: streaming errors are swallowed)
//! ```
//!
//! Only an open failure or a calibration failure ends an attempt with
//! [`ConnectionStatus::Failed`]. There is no automatic reconnect; the caller
//! deactivates and activates again.

pub mod worker;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use crate::config::Config;
use crate::input::calibration::CalibrationConfig;
use crate::input::mapper::AxisConfig;
use crate::input::store::SampleStore;

/// Connection state visible to every thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionStatus {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Failed = 3,
}

impl ConnectionStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionStatus::Connecting,
            2 => ConnectionStatus::Connected,
            3 => ConnectionStatus::Failed,
            _ => ConnectionStatus::Disconnected,
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Atomic cell holding a [`ConnectionStatus`].
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl Default for StatusCell {
    fn default() -> Self {
        Self(AtomicU8::new(ConnectionStatus::Disconnected as u8))
    }
}

impl StatusCell {
    #[must_use]
    pub fn get(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, status: ConnectionStatus) {
        self.0.store(status as u8, Ordering::Release);
    }
}

/// Parameters of one connection attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub port: String,
    pub baud_rate: u32,
    /// Timeout of each line read
    pub read_timeout: Duration,
    /// Wait after opening, while the device resets
    pub settle: Duration,
    /// Upper bound on waiting for the task to exit on deactivate
    pub join_timeout: Duration,
    pub calibration: CalibrationConfig,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ConnectionSettings {
    /// Build settings from the `[serial]` and `[calibration]` sections.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            port: config.serial.port.clone(),
            baud_rate: config.serial.baud_rate,
            read_timeout: Duration::from_millis(config.serial.read_timeout_ms),
            settle: Duration::from_millis(config.serial.settle_ms),
            join_timeout: Duration::from_millis(config.serial.join_timeout_ms),
            calibration: config.calibration,
        }
    }
}

/// State shared between the facade and the connection task.
#[derive(Debug, Default)]
pub struct SharedState {
    pub status: StatusCell,
    pub store: SampleStore,
    raw_line: Mutex<String>,
    axes: RwLock<AxisConfig>,
}

impl SharedState {
    #[must_use]
    pub fn new(axes: AxisConfig) -> Self {
        Self {
            axes: RwLock::new(axes),
            ..Self::default()
        }
    }

    /// Snapshot of the axis configuration.
    #[must_use]
    pub fn axes(&self) -> AxisConfig {
        *self.axes.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_axes(&self, axes: AxisConfig) {
        *self.axes.write().unwrap_or_else(PoisonError::into_inner) = axes;
    }

    /// Most recent line received while streaming.
    #[must_use]
    pub fn raw_line(&self) -> String {
        self.raw_line.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_raw_line(&self, line: &str) {
        let mut raw = self.raw_line.lock().unwrap_or_else(PoisonError::into_inner);
        raw.clear();
        raw.push_str(line);
    }
}
