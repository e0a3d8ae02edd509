//! # Joydrive
//!
//! Drive a DC motor from an analog joystick.
//!
//! This application reads a joystick through Linux evdev, calibrates it at
//! startup and runs the joystick-to-motor control loop until Ctrl+C.

use anyhow::{Context, Result};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use joydrive::clock::{Clock, SystemClock};
use joydrive::config::{Config, JoystickConfig, LoggingConfig};
use joydrive::joystick::source::{AdcRange, Axis, EvdevSignalSource};
use joydrive::motor::TracingDriver;
use joydrive::runner::ControlLoop;
use joydrive::telemetry::TelemetryRecorder;

/// File name prefix for daily rolling log files
const LOG_FILE_PREFIX: &str = "joydrive.log";

/// Main entry point for the Joydrive application
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or built-in defaults)
///    - Set up logging with tracing subscriber
///    - Open the joystick device
///
/// 2. **Calibration**
///    - Center phase: keep the stick still
///    - Range phase: sweep the stick to all extremes
///
/// 3. **Main Loop**
///    - One control tick every `loop_delay_ms`
///    - Optional telemetry snapshots
///    - Handle Ctrl+C for graceful shutdown
///
/// 4. **Shutdown**
///    - Emergency stop of the motor
///
/// # Errors
///
/// Returns error if:
/// - The configuration file cannot be read or is invalid
/// - No joystick device can be opened
/// - The telemetry directory cannot be created
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1);
    let config = load_config(config_path.as_deref())?;
    let _log_guard = init_logging(&config.logging);

    info!("Joydrive v{} starting...", env!("CARGO_PKG_VERSION"));

    let source = open_joystick(&config.joystick)?;
    let clock = SystemClock::new();
    let mut control = ControlLoop::from_config(source, TracingDriver::new(), clock, &config);
    control.begin();

    // Calibration sleeps between samples; keep it off the runtime threads
    let mut control = tokio::task::spawn_blocking(move || {
        control.calibrate();
        control
    })
    .await
    .context("calibration task failed")?;

    let mut telemetry = if config.telemetry.enabled {
        Some(TelemetryRecorder::new(&config.telemetry)?)
    } else {
        None
    };

    let mut ticker = interval(Duration::from_millis(u64::from(config.runner.loop_delay_ms)));

    info!("Starting control loop every {}ms", config.runner.loop_delay_ms);
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = match control.tick() {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        debug!("Tick skipped: {}", e);
                        continue;
                    }
                };

                if let Some(recorder) = telemetry.as_mut() {
                    if let Err(e) = recorder.record(clock.now_ms(), &snapshot) {
                        warn!("Failed to write telemetry: {}", e);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    control.shutdown();

    if let Some(recorder) = telemetry.as_mut() {
        recorder.flush()?;
    }

    Ok(())
}

/// Loads the configuration file, or the built-in defaults when no path is given.
fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::load(path).with_context(|| format!("failed to load config from {}", path))
        }
        None => Ok(Config::default()),
    }
}

/// Installs the global subscriber; `RUST_LOG` overrides the INFO default.
///
/// The returned guard must live until exit so buffered file output is flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    if config.log_dir.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Some(guard)
}

/// Opens the configured device, or the first one exposing both axes.
fn open_joystick(config: &JoystickConfig) -> Result<EvdevSignalSource> {
    let source = if config.device_path.is_empty() {
        EvdevSignalSource::detect(config.x_axis_code, config.y_axis_code)?
    } else {
        EvdevSignalSource::open(&config.device_path, config.x_axis_code, config.y_axis_code)?
    };

    let configured = AdcRange::new(config.adc_min, config.adc_max);
    for axis in Axis::ALL {
        match source.reported_range(axis) {
            Ok(reported) if reported != configured => warn!(
                "{} axis reports {}..={} but adc range is configured as {}..={}",
                axis, reported.min, reported.max, configured.min, configured.max
            ),
            Ok(_) => {}
            Err(e) => debug!("No range information for {} axis: {}", axis, e),
        }
    }

    Ok(source)
}
