//! # AirMouse Bridge
//!
//! Use a gyroscope "air mouse" on a serial port as a pointing device.
//!
//! This application connects to the device, calibrates it and then prints
//! the smoothed input at the configured tick rate.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::time::interval;
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;

use airmouse_bridge::airmouse::AirMouse;
use airmouse_bridge::config::{Config, LoggingConfig};
use airmouse_bridge::connection::ConnectionStatus;
use airmouse_bridge::events::AirMouseEvent;
use airmouse_bridge::telemetry::{RawLineHistory, TelemetryRecord, TelemetryRecorder};

/// Number of ticks between status log messages
const LOG_INTERVAL_TICKS: u64 = 300;

/// Log file name prefix inside `[logging] file_dir`
const LOG_FILE_NAME: &str = "airmouse-bridge.log";

#[derive(Parser)]
#[command(name = "airmouse-bridge", about = "Gyroscope air mouse over a serial port")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port, overrides the configuration
    #[arg(long)]
    port: Option<String>,

    /// Baud rate, overrides the configuration
    #[arg(long)]
    baud: Option<u32>,
}

/// Main entry point for AirMouse Bridge application
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration and apply command line overrides
///    - Set up logging (console, plus daily log files when configured)
///    - Activate the Air Mouse and wait for calibration to finish
///
/// 2. **Main Loop**
///    - Tick the facade at `update_rate_hz`
///    - Track distinct raw lines and record telemetry when enabled
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Deactivate (stop the connection task, close the port)
///    - Flush telemetry
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded or is invalid
/// - The device does not reach the connected state in time
///
/// # Examples
///
/// ```bash
/// cargo run --release -- --port /dev/ttyUSB0
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    config.validate().context("invalid configuration")?;

    // Held until exit so buffered log lines are written
    let _log_guard = init_logging(&config.logging);

    info!("AirMouse Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut mouse = AirMouse::new(&config);
    mouse.subscribe(|event| match event {
        AirMouseEvent::StatusChanged { to: ConnectionStatus::Failed, .. } => {
            warn!("Air Mouse connection failed, restart to retry");
        }
        AirMouseEvent::StatusChanged { from, to } => debug!("Status event: {} -> {}", from, to),
    });

    mouse.activate();
    let connect_timeout = Duration::from_millis(config.host.connect_timeout_ms);
    info!("Waiting up to {:?} for calibration, keep the device still", connect_timeout);

    let status = mouse.wait_for_connection(connect_timeout).await;
    mouse.update();
    if status != ConnectionStatus::Connected {
        mouse.deactivate().await;
        bail!(
            "Air Mouse on {} did not connect (status: {})",
            config.serial.port,
            status
        );
    }

    let mut history = RawLineHistory::new(config.host.raw_history_lines);
    let mut recorder = if config.telemetry.enabled {
        Some(TelemetryRecorder::new(&config.telemetry)?)
    } else {
        None
    };

    let period = Duration::from_secs_f64(1.0 / f64::from(config.host.update_rate_hz));
    let mut tick = interval(period);

    info!("Streaming at {}Hz", config.host.update_rate_hz);
    info!("Press Ctrl+C to exit");

    let mut tick_count: u64 = 0;

    // Main loop
    loop {
        tokio::select! {
            _ = tick.tick() => {
                mouse.update();
                tick_count += 1;

                let raw = mouse.raw_data_string();
                if history.push_if_new(&raw) {
                    debug!("Raw: {}", raw);
                }

                if let Some(active) = recorder.as_mut() {
                    let record = TelemetryRecord::now(mouse.status(), mouse.input(), mouse.roll_input(), &raw);
                    if let Err(e) = active.record(&record) {
                        warn!("Telemetry disabled: {}", e);
                        recorder = None;
                    }
                }

                if tick_count % LOG_INTERVAL_TICKS == 0 {
                    let input = mouse.input();
                    info!(
                        "Input x={:.3} y={:.3} roll={:.3} ({})",
                        input.x, input.y, mouse.roll_input(), mouse.status()
                    );
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    mouse.deactivate().await;
    if let Some(recorder) = recorder.as_mut() {
        recorder.flush()?;
    }
    info!("Recent raw lines:\n{}", history.render());
    info!("Total ticks: {}", tick_count);

    Ok(())
}

/// Console logging, plus daily rolling files when `file_dir` is set.
///
/// `RUST_LOG` overrides the default `info` filter.
fn init_logging(config: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let (file_layer, guard) = match &config.file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}
