//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field defaults to the device constants, so an empty file (or no file
//! at all, via [`Config::default`]) describes the stock hardware. The
//! configuration is read once at startup and never mutated afterwards.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{JoydriveError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub joystick: JoystickConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub motor: MotorConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analog input and normalization settings
#[derive(Debug, Deserialize, Clone)]
pub struct JoystickConfig {
    /// evdev device path; empty means auto-detect
    #[serde(default)]
    pub device_path: String,

    /// evdev absolute axis code sampled as X
    #[serde(default = "default_x_axis_code")]
    pub x_axis_code: u16,

    /// evdev absolute axis code sampled as Y
    #[serde(default = "default_y_axis_code")]
    pub y_axis_code: u16,

    #[serde(default = "default_adc_min")]
    pub adc_min: i32,

    #[serde(default = "default_adc_max")]
    pub adc_max: i32,

    #[serde(default = "default_min_output")]
    pub min_output: i32,

    #[serde(default = "default_max_output")]
    pub max_output: i32,

    /// Smoothed values with a smaller magnitude are reported as 0
    #[serde(default = "default_dead_zone")]
    pub dead_zone: i32,

    /// Moving-average window length
    #[serde(default = "default_filter_depth")]
    pub filter_depth: usize,
}

/// Startup calibration timing and acceptance thresholds
#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    /// Time the operator gets to let the stick settle before center sampling
    #[serde(default = "default_center_settle_ms")]
    pub center_settle_ms: u32,

    #[serde(default = "default_center_samples")]
    pub center_samples: u32,

    #[serde(default = "default_center_sample_delay_ms")]
    pub center_sample_delay_ms: u32,

    /// Minimum share of in-range center samples, per axis
    #[serde(default = "default_min_valid_percent")]
    pub min_valid_percent: u32,

    #[serde(default = "default_range_prompt_ms")]
    pub range_prompt_ms: u32,

    #[serde(default = "default_range_duration_ms")]
    pub range_duration_ms: u32,

    #[serde(default = "default_range_sample_interval_ms")]
    pub range_sample_interval_ms: u32,

    /// Swept span below this share of the ADC range is reported as degraded
    #[serde(default = "default_min_range_percent")]
    pub min_range_percent: u32,
}

/// Position-to-command policy
///
/// Dead zones are percentages of the joystick's `max_output`.
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default = "default_direction_dead_zone")]
    pub direction_dead_zone: i32,

    #[serde(default = "default_speed_dead_zone")]
    pub speed_dead_zone: i32,

    /// Lowest percentage that actually turns the motor
    #[serde(default = "default_min_motor_speed_percent")]
    pub min_motor_speed_percent: i32,

    /// Speed delta (in percent) that counts as a new command
    #[serde(default = "default_change_threshold_percent")]
    pub change_threshold_percent: i32,
}

/// H-bridge output and ramp settings
#[derive(Debug, Deserialize, Clone)]
pub struct MotorConfig {
    #[serde(default = "default_min_speed")]
    pub min_speed: i32,

    /// Full-scale PWM duty
    #[serde(default = "default_max_speed")]
    pub max_speed: i32,

    #[serde(default = "default_ramp_step")]
    pub ramp_step: i32,

    #[serde(default = "default_ramp_delay_ms")]
    pub ramp_delay_ms: u32,
}

/// Control loop cadence
#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    #[serde(default = "default_loop_delay_ms")]
    pub loop_delay_ms: u32,

    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u32,

    /// Drive speed changes through the ramp instead of applying them at once
    #[serde(default)]
    pub use_ramp: bool,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_telemetry_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u32,
}

/// Diagnostic log output
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; empty logs to stdout only
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_x_axis_code() -> u16 { 0x00 } // ABS_X
fn default_y_axis_code() -> u16 { 0x01 } // ABS_Y
fn default_adc_min() -> i32 { 0 }
fn default_adc_max() -> i32 { 4095 }
fn default_min_output() -> i32 { -100 }
fn default_max_output() -> i32 { 100 }
fn default_dead_zone() -> i32 { 8 }
fn default_filter_depth() -> usize { 3 }

fn default_center_settle_ms() -> u32 { 3000 }
fn default_center_samples() -> u32 { 50 }
fn default_center_sample_delay_ms() -> u32 { 20 }
fn default_min_valid_percent() -> u32 { 80 }
fn default_range_prompt_ms() -> u32 { 1000 }
fn default_range_duration_ms() -> u32 { 5000 }
fn default_range_sample_interval_ms() -> u32 { 50 }
fn default_min_range_percent() -> u32 { 25 }

fn default_direction_dead_zone() -> i32 { 15 }
fn default_speed_dead_zone() -> i32 { 10 }
fn default_min_motor_speed_percent() -> i32 { 30 }
fn default_change_threshold_percent() -> i32 { 5 }

fn default_min_speed() -> i32 { 0 }
fn default_max_speed() -> i32 { 255 }
fn default_ramp_step() -> i32 { 5 }
fn default_ramp_delay_ms() -> u32 { 20 }

fn default_loop_delay_ms() -> u32 { 100 }
fn default_status_interval_ms() -> u32 { 2000 }

fn default_telemetry_dir() -> String { "./telemetry".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u32 { 100 }

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            x_axis_code: default_x_axis_code(),
            y_axis_code: default_y_axis_code(),
            adc_min: default_adc_min(),
            adc_max: default_adc_max(),
            min_output: default_min_output(),
            max_output: default_max_output(),
            dead_zone: default_dead_zone(),
            filter_depth: default_filter_depth(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            center_settle_ms: default_center_settle_ms(),
            center_samples: default_center_samples(),
            center_sample_delay_ms: default_center_sample_delay_ms(),
            min_valid_percent: default_min_valid_percent(),
            range_prompt_ms: default_range_prompt_ms(),
            range_duration_ms: default_range_duration_ms(),
            range_sample_interval_ms: default_range_sample_interval_ms(),
            min_range_percent: default_min_range_percent(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            direction_dead_zone: default_direction_dead_zone(),
            speed_dead_zone: default_speed_dead_zone(),
            min_motor_speed_percent: default_min_motor_speed_percent(),
            change_threshold_percent: default_change_threshold_percent(),
        }
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            min_speed: default_min_speed(),
            max_speed: default_max_speed(),
            ramp_step: default_ramp_step(),
            ramp_delay_ms: default_ramp_delay_ms(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            loop_delay_ms: default_loop_delay_ms(),
            status_interval_ms: default_status_interval_ms(),
            use_ramp: false,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_telemetry_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
        }
    }
}

/// Builds a configuration error from a message.
fn invalid(msg: impl std::fmt::Display) -> JoydriveError {
    JoydriveError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joydrive::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Examples
    ///
    /// ```
    /// use joydrive::config::Config;
    ///
    /// let config = Config::from_toml("[motor]\nramp_step = 10\n")?;
    /// assert_eq!(config.motor.ramp_step, 10);
    /// assert_eq!(config.motor.max_speed, 255);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        let joy = &self.joystick;

        if joy.adc_min >= joy.adc_max {
            return Err(invalid("adc_min must be less than adc_max"));
        }

        if joy.min_output >= 0 || joy.max_output <= 0 {
            return Err(invalid("min_output must be negative and max_output positive"));
        }

        if joy.dead_zone < 0 || joy.dead_zone >= joy.max_output {
            return Err(invalid("dead_zone must be between 0 and max_output"));
        }

        if joy.filter_depth == 0 || joy.filter_depth > 64 {
            return Err(invalid("filter_depth must be between 1 and 64"));
        }

        // Validate calibration timing
        let cal = &self.calibration;

        if cal.center_samples == 0 {
            return Err(invalid("center_samples must be greater than 0"));
        }

        if cal.min_valid_percent == 0 || cal.min_valid_percent > 100 {
            return Err(invalid("min_valid_percent must be between 1 and 100"));
        }

        if cal.min_range_percent > 100 {
            return Err(invalid("min_range_percent must be between 0 and 100"));
        }

        if cal.range_duration_ms == 0 || cal.range_duration_ms > 60000 {
            return Err(invalid("range_duration_ms must be between 1 and 60000"));
        }

        if cal.range_sample_interval_ms == 0 || cal.range_sample_interval_ms > cal.range_duration_ms {
            return Err(invalid(
                "range_sample_interval_ms must be between 1 and range_duration_ms",
            ));
        }

        for (name, value) in [
            ("center_settle_ms", cal.center_settle_ms),
            ("center_sample_delay_ms", cal.center_sample_delay_ms),
            ("range_prompt_ms", cal.range_prompt_ms),
        ] {
            if value > 60000 {
                return Err(invalid(format!("{} must be at most 60000", name)));
            }
        }

        // Validate control policy
        let control = &self.control;

        if !(0..=100).contains(&control.direction_dead_zone) {
            return Err(invalid("direction_dead_zone must be between 0 and 100"));
        }

        // The speed remap divides by (100 - speed_dead_zone)
        if control.speed_dead_zone < 0 || control.speed_dead_zone >= 100 {
            return Err(invalid("speed_dead_zone must be between 0 and 99"));
        }

        if !(0..=100).contains(&control.min_motor_speed_percent) {
            return Err(invalid("min_motor_speed_percent must be between 0 and 100"));
        }

        if !(0..=100).contains(&control.change_threshold_percent) {
            return Err(invalid("change_threshold_percent must be between 0 and 100"));
        }

        // Validate motor output
        let motor = &self.motor;

        if motor.min_speed < 0 || motor.min_speed >= motor.max_speed {
            return Err(invalid("min_speed must be non-negative and less than max_speed"));
        }

        if motor.max_speed > i32::from(u16::MAX) {
            return Err(invalid("max_speed must fit a 16-bit duty cycle"));
        }

        if motor.ramp_step <= 0 || motor.ramp_step > motor.max_speed {
            return Err(invalid("ramp_step must be between 1 and max_speed"));
        }

        if motor.ramp_delay_ms > 10000 {
            return Err(invalid("ramp_delay_ms must be at most 10000"));
        }

        // Validate runner cadence
        if self.runner.loop_delay_ms == 0 || self.runner.loop_delay_ms > 10000 {
            return Err(invalid("loop_delay_ms must be between 1 and 10000"));
        }

        if self.runner.status_interval_ms == 0 {
            return Err(invalid("status_interval_ms must be greater than 0"));
        }

        // Validate telemetry configuration
        let telemetry = &self.telemetry;

        if telemetry.enabled && telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if telemetry.log_interval_ms == 0 || telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        Ok(())
    }
}
