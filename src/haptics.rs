//! # Haptics Module
//!
//! Outbound vibration commands and timed vibration patterns.
//!
//! This module handles:
//! - The multi-producer FIFO from callers to the connection task
//! - Multi-pulse patterns driven by deadlines checked on every tick

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::protocol::VibrationCommand;

/// Create a connected command queue pair.
#[must_use]
pub fn command_queue() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, CommandReceiver { rx })
}

/// Producer side; cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<VibrationCommand>,
}

impl CommandSender {
    /// Enqueue a command. Returns `false` if the receiver is gone.
    pub fn send(&self, command: VibrationCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

/// Consumer side, owned by the connection task.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::UnboundedReceiver<VibrationCommand>,
}

impl CommandReceiver {
    /// Take every command queued right now, oldest first. Never blocks.
    pub fn drain(&mut self) -> Vec<VibrationCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = self.rx.try_recv() {
            commands.push(command);
        }
        commands
    }
}

/// Haptic feedback presets
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct HapticsConfig {
    #[serde(default = "default_pickup_intensity")]
    pub pickup_intensity: i32,

    #[serde(default = "default_pickup_duration_ms")]
    pub pickup_duration_ms: i32,

    #[serde(default = "default_success_intensity")]
    pub success_intensity: i32,

    #[serde(default = "default_success_pulse_ms")]
    pub success_pulse_ms: i32,

    #[serde(default = "default_success_gap_ms")]
    pub success_gap_ms: u64,
}

pub(crate) fn default_pickup_intensity() -> i32 { 200 }
pub(crate) fn default_pickup_duration_ms() -> i32 { 150 }
pub(crate) fn default_success_intensity() -> i32 { 255 }
pub(crate) fn default_success_pulse_ms() -> i32 { 100 }
pub(crate) fn default_success_gap_ms() -> u64 { 150 }

impl Default for HapticsConfig {
    fn default() -> Self {
        Self {
            pickup_intensity: default_pickup_intensity(),
            pickup_duration_ms: default_pickup_duration_ms(),
            success_intensity: default_success_intensity(),
            success_pulse_ms: default_success_pulse_ms(),
            success_gap_ms: default_success_gap_ms(),
        }
    }
}

impl HapticsConfig {
    /// Single pulse played when an object is picked up.
    #[must_use]
    pub fn pickup_pattern(&self) -> HapticPattern {
        HapticPattern::pulse(self.pickup_intensity, self.pickup_duration_ms)
    }

    /// Double pulse played on success.
    #[must_use]
    pub fn success_pattern(&self) -> HapticPattern {
        HapticPattern::double_pulse(
            self.success_intensity,
            self.success_pulse_ms,
            Duration::from_millis(self.success_gap_ms),
        )
    }
}

/// One vibration pulse of a pattern, `offset` after the pattern starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HapticPulse {
    pub offset: Duration,
    pub intensity: i32,
    pub duration_ms: i32,
}

/// A sequence of pulses.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HapticPattern {
    pulses: Vec<HapticPulse>,
}

impl HapticPattern {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pulse; pulses may be added in any order.
    #[must_use]
    pub fn then(mut self, offset: Duration, intensity: i32, duration_ms: i32) -> Self {
        self.pulses.push(HapticPulse { offset, intensity, duration_ms });
        self.pulses.sort_by_key(|p| p.offset);
        self
    }

    /// One immediate pulse.
    #[must_use]
    pub fn pulse(intensity: i32, duration_ms: i32) -> Self {
        Self::new().then(Duration::ZERO, intensity, duration_ms)
    }

    /// Two pulses, the second `gap` after the first.
    #[must_use]
    pub fn double_pulse(intensity: i32, duration_ms: i32, gap: Duration) -> Self {
        Self::new()
            .then(Duration::ZERO, intensity, duration_ms)
            .then(gap, intensity, duration_ms)
    }

    #[must_use]
    pub fn pulses(&self) -> &[HapticPulse] {
        &self.pulses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }
}

/// Plays patterns by releasing pulses whose deadline has passed.
///
/// Starting a new pattern replaces the one in progress.
#[derive(Debug, Default)]
pub struct HapticPlayer {
    active: Option<(Instant, HapticPattern, usize)>,
}

impl HapticPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `pattern` at `now`.
    pub fn start(&mut self, pattern: HapticPattern, now: Instant) {
        self.active = if pattern.is_empty() {
            None
        } else {
            Some((now, pattern, 0))
        };
    }

    /// Pulses due at `now`, in order. Finished patterns are dropped.
    pub fn poll(&mut self, now: Instant) -> Vec<HapticPulse> {
        let Some((started, pattern, next)) = self.active.as_mut() else {
            return Vec::new();
        };

        let elapsed = now.saturating_duration_since(*started);
        let mut due = Vec::new();
        while let Some(pulse) = pattern.pulses.get(*next) {
            if pulse.offset > elapsed {
                break;
            }
            due.push(*pulse);
            *next += 1;
        }

        if *next >= pattern.pulses.len() {
            self.active = None;
        }
        due
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }
}
