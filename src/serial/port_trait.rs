//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;

use crate::error::Result;

/// Trait for a line-oriented serial device
///
/// A device is owned by exactly one connection task for its whole lifetime.
#[async_trait]
pub trait SerialDevice: Send {
    /// Read one newline-terminated line (terminator stripped)
    ///
    /// Returns an error of kind [`io::ErrorKind::TimedOut`] if no complete line
    /// arrives within `timeout`.
    async fn read_line(&mut self, timeout: Duration) -> io::Result<String>;

    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Close the device; further reads and writes fail
    async fn close(&mut self) -> io::Result<()>;
}

/// Opens serial devices by port name
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SerialOpener: Send + Sync {
    /// Open `port` at `baud_rate`
    async fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialDevice>>;
}
