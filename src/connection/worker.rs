//! Background connection task.
//!
//! The task owns the serial device for its whole life. Within one iteration
//! of the streaming loop the order is fixed: drain commands, read one line,
//! decode, map, store. Nothing else ever touches the device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use super::{ConnectionSettings, ConnectionStatus, SharedState};
use crate::error::AirMouseError;
use crate::haptics::CommandReceiver;
use crate::input::calibration::{calibrate, GyroBias};
use crate::input::mapper::map_sample;
use crate::protocol::decoder::decode_line;
use crate::protocol::encoder::encode_vibration_command;
use crate::serial::port_trait::{SerialDevice, SerialOpener};
use crate::serial::{read_device_line, write_device_line, READ_ERROR_BACKOFF};

/// One connection attempt, from open to close.
pub struct ConnectionTask {
    opener: Arc<dyn SerialOpener>,
    settings: ConnectionSettings,
    shared: Arc<SharedState>,
    stop: Arc<AtomicBool>,
    commands: CommandReceiver,
}

impl ConnectionTask {
    pub fn new(
        opener: Arc<dyn SerialOpener>,
        settings: ConnectionSettings,
        shared: Arc<SharedState>,
        stop: Arc<AtomicBool>,
        commands: CommandReceiver,
    ) -> Self {
        Self {
            opener,
            settings,
            shared,
            stop,
            commands,
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Run the attempt to completion
    ///
    /// Returns when the stop flag is raised or the attempt fails. The device
    /// is closed on every exit path after a successful open.
    pub async fn run(mut self) {
        let settings = self.settings.clone();

        let mut device = match self.opener.open(&settings.port, settings.baud_rate).await {
            Ok(device) => device,
            Err(e) => {
                error!("Connection failed: {}", e);
                self.shared.status.set(ConnectionStatus::Failed);
                return;
            }
        };
        info!("Connected to port {} @ {} baud", settings.port, settings.baud_rate);

        if !settle(&self.stop, settings.settle, settings.read_timeout).await {
            close(device.as_mut()).await;
            return;
        }

        let bias = match calibrate(
            device.as_mut(),
            &settings.calibration,
            settings.read_timeout,
            &self.stop,
        )
        .await
        {
            Ok(bias) => bias,
            Err(AirMouseError::Cancelled) => {
                debug!("Calibration interrupted by stop request");
                close(device.as_mut()).await;
                return;
            }
            Err(e) => {
                error!("{}", e);
                self.shared.status.set(ConnectionStatus::Failed);
                close(device.as_mut()).await;
                return;
            }
        };

        self.shared.status.set(ConnectionStatus::Connected);
        info!("Air Mouse streaming");

        self.stream(device.as_mut(), &bias, settings.read_timeout).await;

        close(device.as_mut()).await;
        debug!("Connection task finished");
    }

    async fn stream(&mut self, device: &mut dyn SerialDevice, bias: &GyroBias, read_timeout: Duration) {
        while !self.stopped() {
            for command in self.commands.drain() {
                let line = encode_vibration_command(&command);
                if let Err(e) = write_device_line(device, &line).await {
                    debug!("Dropping vibration command {:?}: {}", command, e);
                }
            }

            match read_device_line(device, read_timeout).await {
                Ok(line) => handle_line(&self.shared, bias, &line),
                Err(AirMouseError::ReadTimeout) => {}
                Err(e) => {
                    debug!("Read error while streaming: {}", e);
                    tokio::time::sleep(READ_ERROR_BACKOFF).await;
                }
            }
        }
    }
}

/// Wait for the device to reset after opening. Returns `false` if stopped.
async fn settle(stop: &AtomicBool, settle: Duration, slice: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + settle;
    while tokio::time::Instant::now() < deadline {
        if stop.load(Ordering::Acquire) {
            return false;
        }
        let step = deadline
            .saturating_duration_since(tokio::time::Instant::now())
            .min(slice);
        tokio::time::sleep(step).await;
    }
    !stop.load(Ordering::Acquire)
}

/// Publish one streamed line: raw text always, mapped sample if it decodes.
fn handle_line(shared: &SharedState, bias: &GyroBias, line: &str) {
    shared.set_raw_line(line);

    match decode_line(line) {
        Ok(raw) => {
            let corrected = bias.correct(&raw);
            let sample = map_sample(&corrected, &shared.axes());
            shared.store.replace(sample);
        }
        Err(e) => trace!("Dropping line: {}", e),
    }
}

async fn close(device: &mut dyn SerialDevice) {
    if let Err(e) = device.close().await {
        warn!("Failed to close serial port: {}", e);
    }
}
