//! # Signal Source Module
//!
//! Trait abstraction for the two analog joystick channels, plus an evdev
//! implementation for Linux hosts.
//!
//! A source only samples; range checking against the device ADC bounds
//! happens in [`AdcRange::check`] so every implementation is judged the same
//! way.

use evdev::{AbsoluteAxisType, Device};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{JoydriveError, Result};

/// Joystick axis selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal deflection, drives direction
    X,
    /// Vertical deflection, drives speed
    Y,
}

impl Axis {
    /// Both axes, in sampling order.
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => f.write_str("X"),
            Axis::Y => f.write_str("Y"),
        }
    }
}

/// Inclusive range of raw values the converter can legitimately produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcRange {
    pub min: i32,
    pub max: i32,
}

impl AdcRange {
    #[must_use]
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Width of the range in raw units.
    #[must_use]
    pub fn span(&self) -> i64 {
        i64::from(self.max) - i64::from(self.min)
    }

    /// Rest position assumed before calibration (512 on a 10-bit converter).
    ///
    /// # Examples
    ///
    /// ```
    /// use joydrive::joystick::source::AdcRange;
    ///
    /// assert_eq!(AdcRange::new(0, 1023).midpoint(), 512);
    /// assert_eq!(AdcRange::new(0, 4095).midpoint(), 2048);
    /// ```
    #[must_use]
    pub fn midpoint(&self) -> i32 {
        (i64::from(self.min) + (self.span() + 1) / 2) as i32
    }

    /// Passes `value` through if it is in range, otherwise reports a sensor fault.
    pub fn check(&self, axis: Axis, value: i32) -> Result<i32> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(JoydriveError::SensorFault {
                axis,
                reason: format!("value {} outside {}..={}", value, self.min, self.max),
            })
        }
    }
}

/// Trait for sampling the joystick's analog channels
#[cfg_attr(test, mockall::automock)]
pub trait SignalSource {
    /// Takes one blocking sample of `axis`.
    fn read_axis(&mut self, axis: Axis) -> Result<i32>;
}

/// Joystick read through the Linux evdev absolute-axis interface.
pub struct EvdevSignalSource {
    device: Device,
    device_path: String,
    x_axis: AbsoluteAxisType,
    y_axis: AbsoluteAxisType,
}

impl fmt::Debug for EvdevSignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvdevSignalSource")
            .field("device_path", &self.device_path)
            .field("x_axis", &self.x_axis)
            .field("y_axis", &self.y_axis)
            .finish_non_exhaustive()
    }
}

impl EvdevSignalSource {
    /// Opens a specific `/dev/input/eventX` device.
    ///
    /// # Errors
    ///
    /// - `Io`: the device cannot be opened
    /// - `DeviceNotFound`: the device lacks one of the requested axes
    pub fn open<P: AsRef<Path>>(path: P, x_code: u16, y_code: u16) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::open(path)?;
        let (x_axis, y_axis) = (AbsoluteAxisType(x_code), AbsoluteAxisType(y_code));

        if !Self::has_axes(&device, x_axis, y_axis) {
            return Err(JoydriveError::DeviceNotFound(format!(
                "{} does not report axes {:?}/{:?}",
                path.display(),
                x_axis,
                y_axis
            )));
        }

        let device_path = path.to_string_lossy().to_string();
        info!("Opened joystick at {}", device_path);

        Ok(Self {
            device,
            device_path,
            x_axis,
            y_axis,
        })
    }

    /// Opens the first input device that reports both requested axes.
    ///
    /// Devices are scanned in path order so the choice is deterministic when
    /// several joysticks are attached.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no readable device exposes both axes.
    pub fn detect(x_code: u16, y_code: u16) -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(JoydriveError::DeviceNotFound(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event {
                continue;
            }

            match Self::open(&path, x_code, y_code) {
                Ok(source) => return Ok(source),
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }

        Err(JoydriveError::DeviceNotFound(
            "no input device with the configured axes".to_string(),
        ))
    }

    fn has_axes(device: &Device, x_axis: AbsoluteAxisType, y_axis: AbsoluteAxisType) -> bool {
        device
            .supported_absolute_axes()
            .map(|axes| axes.contains(x_axis) && axes.contains(y_axis))
            .unwrap_or(false)
    }

    /// Path this source was opened from.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Raw range the kernel reports for `axis`, for comparison with the
    /// configured ADC bounds.
    pub fn reported_range(&self, axis: Axis) -> Result<AdcRange> {
        let state = self.device.get_abs_state()?;
        let info = state
            .get(self.code(axis).0 as usize)
            .ok_or_else(|| Self::unknown_axis(axis))?;
        Ok(AdcRange::new(info.minimum, info.maximum))
    }

    fn code(&self, axis: Axis) -> AbsoluteAxisType {
        match axis {
            Axis::X => self.x_axis,
            Axis::Y => self.y_axis,
        }
    }

    fn unknown_axis(axis: Axis) -> JoydriveError {
        JoydriveError::SensorFault {
            axis,
            reason: "axis code out of range".to_string(),
        }
    }
}

impl SignalSource for EvdevSignalSource {
    fn read_axis(&mut self, axis: Axis) -> Result<i32> {
        let state = self
            .device
            .get_abs_state()
            .map_err(|e| JoydriveError::SensorFault {
                axis,
                reason: e.to_string(),
            })?;

        state
            .get(self.code(axis).0 as usize)
            .map(|info| info.value)
            .ok_or_else(|| Self::unknown_axis(axis))
    }
}
