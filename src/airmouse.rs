//! # Air Mouse Facade
//!
//! The single object host code depends on.
//!
//! [`AirMouse`] owns the background connection task and the consumer-side
//! state. The host calls [`AirMouse::update`] once per tick; everything else
//! is a cheap read of state the connection task has already published.
//!
//! ```no_run
//! use airmouse_bridge::airmouse::AirMouse;
//! use airmouse_bridge::config::Config;
//! use std::time::Duration;
//!
//! # async fn run() {
//! let mut mouse = AirMouse::new(&Config::default());
//! mouse.activate();
//! mouse.wait_for_connection(Duration::from_secs(12)).await;
//! mouse.update();
//! let cursor = mouse.input();
//! mouse.deactivate().await;
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connection::worker::ConnectionTask;
use crate::connection::{ConnectionSettings, ConnectionStatus, SharedState};
use crate::error::Result;
use crate::events::{AirMouseEvent, EventBus, SubscriptionId};
use crate::haptics::{command_queue, CommandSender, HapticPattern, HapticPlayer, HapticsConfig};
use crate::input::mapper::{AxisConfig, Vector2};
use crate::input::smoothing::SmoothedState;
use crate::protocol::VibrationCommand;
use crate::serial::port_trait::SerialOpener;
use crate::serial::TokioSerialOpener;

/// Poll interval of [`AirMouse::wait_for_connection`]
const CONNECTION_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Handles to a running connection task
struct ActiveConnection {
    stop: Arc<AtomicBool>,
    commands: CommandSender,
    handle: JoinHandle<()>,
}

/// Gyroscope air mouse input source
pub struct AirMouse {
    opener: Arc<dyn SerialOpener>,
    settings: ConnectionSettings,
    shared: Arc<SharedState>,
    connection: Option<ActiveConnection>,
    smoothed: SmoothedState,
    haptics_config: HapticsConfig,
    player: HapticPlayer,
    events: EventBus<AirMouseEvent>,
    last_status: ConnectionStatus,
}

impl AirMouse {
    /// Create an inactive Air Mouse using real serial ports.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_opener(config, Arc::new(TokioSerialOpener))
    }

    /// Create an inactive Air Mouse that opens devices through `opener`.
    #[must_use]
    pub fn with_opener(config: &Config, opener: Arc<dyn SerialOpener>) -> Self {
        Self {
            opener,
            settings: ConnectionSettings::from_config(config),
            shared: Arc::new(SharedState::new(config.axes)),
            connection: None,
            smoothed: SmoothedState::new(),
            haptics_config: config.haptics,
            player: HapticPlayer::new(),
            events: EventBus::new(),
            last_status: ConnectionStatus::Disconnected,
        }
    }

    /// Set port, baud rate and axis mapping.
    ///
    /// The axis mapping applies to the next streamed line. Port and baud rate
    /// apply from the next [`activate`](Self::activate).
    ///
    /// # Errors
    ///
    /// Returns [`AirMouseError::InvalidAxisConfig`](crate::error::AirMouseError::InvalidAxisConfig)
    /// if `axes` is out of range; nothing is changed in that case.
    pub fn configure(&mut self, port_name: &str, baud_rate: u32, axes: AxisConfig) -> Result<()> {
        axes.validate()?;
        self.settings.port = port_name.to_string();
        self.settings.baud_rate = baud_rate;
        self.shared.set_axes(axes);
        Ok(())
    }

    /// Start a connection attempt in the background.
    ///
    /// Does nothing while a previous attempt is still held, including one that
    /// ended in [`ConnectionStatus::Failed`]; call
    /// [`deactivate`](Self::deactivate) first to retry.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn activate(&mut self) {
        if self.connection.is_some() {
            debug!("Activate ignored, connection already active");
            return;
        }

        info!(
            "Activating Air Mouse on {} @ {} baud",
            self.settings.port, self.settings.baud_rate
        );

        self.shared.store.reset();
        self.shared.set_raw_line("");
        self.publish_status();
        self.shared.status.set(ConnectionStatus::Connecting);
        self.publish_status();

        let stop = Arc::new(AtomicBool::new(false));
        let (commands, receiver) = command_queue();
        let task = ConnectionTask::new(
            Arc::clone(&self.opener),
            self.settings.clone(),
            Arc::clone(&self.shared),
            Arc::clone(&stop),
            receiver,
        );
        let handle = tokio::spawn(task.run());

        self.connection = Some(ActiveConnection { stop, commands, handle });
    }

    /// Stop the connection task and close the device.
    ///
    /// Waits at most the configured join timeout for the task to exit on its
    /// own, then aborts it. Always ends in [`ConnectionStatus::Disconnected`].
    pub async fn deactivate(&mut self) {
        self.publish_status();
        if let Some(mut connection) = self.connection.take() {
            connection.stop.store(true, Ordering::Release);

            match tokio::time::timeout(self.settings.join_timeout, &mut connection.handle).await {
                Ok(Ok(())) => debug!("Connection task stopped"),
                Ok(Err(e)) => warn!("Connection task ended abnormally: {}", e),
                Err(_) => {
                    warn!(
                        "Connection task did not stop within {:?}, aborting",
                        self.settings.join_timeout
                    );
                    connection.handle.abort();
                    let _ = connection.handle.await;
                }
            }
            info!("Air Mouse deactivated");
        }

        self.player.cancel();
        self.shared.status.set(ConnectionStatus::Disconnected);
        self.publish_status();
    }

    /// Wait while the attempt is [`ConnectionStatus::Connecting`], up to `timeout`.
    ///
    /// Returns the status at the end of the wait.
    pub async fn wait_for_connection(&self, timeout: Duration) -> ConnectionStatus {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.status();
            if status != ConnectionStatus::Connecting || Instant::now() >= deadline {
                return status;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(CONNECTION_POLL_INTERVAL.min(remaining)).await;
        }
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.shared.status.get()
    }

    /// Smoothed directional input.
    #[must_use]
    pub fn input(&self) -> Vector2 {
        self.smoothed.directional()
    }

    /// Smoothed roll input.
    #[must_use]
    pub fn roll_input(&self) -> f32 {
        self.smoothed.roll()
    }

    /// Most recent raw line received from the device.
    #[must_use]
    pub fn raw_data_string(&self) -> String {
        self.shared.raw_line()
    }

    /// Current axis mapping
    #[must_use]
    pub fn axes(&self) -> AxisConfig {
        self.shared.axes()
    }

    #[must_use]
    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Queue a vibration command for the device.
    ///
    /// Returns `false` without queueing anything unless the status is
    /// [`ConnectionStatus::Connected`] and `duration_ms` is positive. The
    /// intensity is clamped to 0-255.
    pub fn send_vibration_command(&self, intensity: i32, duration_ms: i32) -> bool {
        if self.status() != ConnectionStatus::Connected {
            return false;
        }
        let Some(connection) = &self.connection else {
            return false;
        };
        match VibrationCommand::new(intensity, duration_ms) {
            Some(command) => connection.commands.send(command),
            None => false,
        }
    }

    /// Start a vibration pattern, replacing the one in progress.
    ///
    /// Pulses due now are sent immediately, later ones from [`update`](Self::update).
    pub fn play_pattern(&mut self, pattern: HapticPattern) {
        self.player.start(pattern, Instant::now());
        self.fire_due_pulses(Instant::now());
    }

    /// Play the configured pickup feedback.
    pub fn play_pickup_feedback(&mut self) {
        self.play_pattern(self.haptics_config.pickup_pattern());
    }

    /// Play the configured success feedback.
    pub fn play_success_feedback(&mut self) {
        self.play_pattern(self.haptics_config.success_pattern());
    }

    /// Consumer tick.
    ///
    /// Emits [`AirMouseEvent::StatusChanged`] when the status moved since it
    /// was last published, advances the smoothing filter while connected and
    /// sends due pattern pulses. Smoothed values stay frozen in any other
    /// status.
    pub fn update(&mut self) {
        let status = self.publish_status();

        if status == ConnectionStatus::Connected {
            let target = self.shared.store.latest();
            let factor = self.shared.axes().smoothing_factor;
            self.smoothed.step(&target, factor);
        }

        self.fire_due_pulses(Instant::now());
    }

    /// Emit a [`AirMouseEvent::StatusChanged`] if the status differs from the
    /// last published one.
    ///
    /// Transitions made by the facade itself are published as they happen.
    /// Those made by the connection task are seen on the next call.
    fn publish_status(&mut self) -> ConnectionStatus {
        let status = self.status();
        if status != self.last_status {
            let event = AirMouseEvent::StatusChanged {
                from: self.last_status,
                to: status,
            };
            info!("Air Mouse status: {} -> {}", self.last_status, status);
            self.last_status = status;
            self.events.emit(&event);
        }
        status
    }

    fn fire_due_pulses(&mut self, now: Instant) {
        for pulse in self.player.poll(now) {
            if !self.send_vibration_command(pulse.intensity, pulse.duration_ms) {
                debug!("Dropping haptic pulse {:?}", pulse);
            }
        }
    }

    /// Register a handler for facade events.
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&AirMouseEvent) + Send + 'static,
    {
        self.events.subscribe(handler)
    }

    pub fn events_mut(&mut self) -> &mut EventBus<AirMouseEvent> {
        &mut self.events
    }
}

impl Drop for AirMouse {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.stop.store(true, Ordering::Release);
            connection.handle.abort();
        }
    }
}
