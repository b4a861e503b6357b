//! # Serial Communication Module
//!
//! Handles serial communication with the Air Mouse device.
//!
//! This module handles:
//! - Opening the serial port (8N1, no flow control)
//! - Line-framed reads with a bounded timeout
//! - Writing command lines
//! - Closing the port when the connection task ends

pub mod line_buffer;
pub mod port_trait;

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::error::{AirMouseError, Result};
use line_buffer::LineBuffer;
use port_trait::{SerialDevice, SerialOpener};

/// Default baud rate of the Air Mouse firmware
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Size of a single raw read
const READ_CHUNK_SIZE: usize = 256;

/// Pause after a non-timeout read error, so a dead port does not spin
pub const READ_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Read one line, reporting an expired timeout as [`AirMouseError::ReadTimeout`].
pub async fn read_device_line(device: &mut dyn SerialDevice, timeout: Duration) -> Result<String> {
    device.read_line(timeout).await.map_err(|e| match e.kind() {
        io::ErrorKind::TimedOut => AirMouseError::ReadTimeout,
        _ => AirMouseError::Io(e),
    })
}

/// Write one command line and flush it.
pub async fn write_device_line(device: &mut dyn SerialDevice, line: &str) -> Result<()> {
    let written = match device.write_all(line.as_bytes()).await {
        Ok(()) => device.flush().await,
        Err(e) => Err(e),
    };
    written.map_err(|e| AirMouseError::WriteFailure(e.to_string()))
}

/// Air Mouse serial port handler
///
/// Wraps a `tokio_serial::SerialStream` and frames incoming bytes into lines.
pub struct AirMouseSerial {
    /// Serial port handle, `None` once closed
    port: Option<tokio_serial::SerialStream>,
    /// Partially received line data
    lines: LineBuffer,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for AirMouseSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirMouseSerial")
            .field("device_path", &self.device_path)
            .field("open", &self.port.is_some())
            .finish_non_exhaustive()
    }
}

impl AirMouseSerial {
    /// Open a specific serial port
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0" or "COM4")
    /// * `baud_rate` - Line speed
    ///
    /// # Errors
    ///
    /// Returns [`AirMouseError::OpenFailure`] if the port cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use airmouse_bridge::serial::AirMouseSerial;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = AirMouseSerial::open("/dev/ttyUSB0", 115_200)?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        debug!("Trying to open serial port: {} @ {} baud", path, baud_rate);

        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| AirMouseError::OpenFailure {
                port: path.to_string(),
                reason: e.to_string(),
            })?;

        info!("Successfully opened Air Mouse device at {}", path);

        Ok(Self {
            port: Some(port),
            lines: LineBuffer::new(),
            device_path: path.to_string(),
        })
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    fn port_mut(&mut self) -> io::Result<&mut tokio_serial::SerialStream> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port closed"))
    }
}

#[async_trait]
impl SerialDevice for AirMouseSerial {
    async fn read_line(&mut self, timeout: Duration) -> io::Result<String> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            if let Some(line) = self.lines.next_line() {
                return Ok(line);
            }

            let port = self.port_mut()?;
            let n = tokio::time::timeout_at(deadline, port.read(&mut chunk))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "read timed out"))??;

            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "serial port returned EOF"));
            }

            self.lines.extend(&chunk[..n]);
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port_mut()?.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.port_mut()?.flush().await
    }

    async fn close(&mut self) -> io::Result<()> {
        if self.port.take().is_some() {
            self.lines.clear();
            info!("Closed serial port {}", self.device_path);
        }
        Ok(())
    }
}

/// Opens real serial ports through `tokio-serial`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSerialOpener;

#[async_trait]
impl SerialOpener for TokioSerialOpener {
    async fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialDevice>> {
        let serial = AirMouseSerial::open(port, baud_rate)?;
        Ok(Box::new(serial))
    }
}
