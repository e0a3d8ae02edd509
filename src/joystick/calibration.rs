//! # Calibration Module
//!
//! Establishes per-axis rest center and travel extents at startup.
//!
//! Calibration runs as two blocking phases, always in this order:
//!
//! 1. **Center**: the operator leaves the stick alone. After a settle delay a
//!    fixed number of samples is averaged per axis. Out-of-range samples are
//!    discarded; if too few survive, the axis falls back to the ADC midpoint.
//! 2. **Range**: the operator sweeps the stick to every extreme for a fixed
//!    wall-clock window while min/max are tracked.
//!
//! Neither phase can fail. Anything short of a clean result is reported as a
//! diagnostic in the returned [`CalibrationReport`] and the profile remains
//! usable.

use tracing::{debug, info, warn};

use super::source::{AdcRange, Axis, SignalSource};
use crate::clock::{elapsed_ms, Clock};
use crate::config::CalibrationConfig;
use crate::error::{JoydriveError, Result};

/// Calibrated extents of one axis in raw ADC units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisCalibration {
    pub min: i32,
    pub center: i32,
    pub max: i32,
}

impl AxisCalibration {
    /// Full ADC travel with the center at the midpoint.
    #[must_use]
    pub fn full_range(adc: AdcRange) -> Self {
        Self {
            min: adc.min,
            center: adc.midpoint(),
            max: adc.max,
        }
    }

    /// Center forced into `[min, max]`; `None` when the bounds are inverted.
    #[must_use]
    pub fn clamped_center(&self) -> Option<i32> {
        (self.min <= self.max).then(|| self.center.clamp(self.min, self.max))
    }

    /// Checks that both halves of the axis can be mapped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCalibrationRange` when the bounds are inverted or a
    /// half has zero width (that half then normalizes to a constant 0).
    pub fn validate(&self) -> Result<()> {
        let degenerate = match self.clamped_center() {
            Some(center) => center == self.min || center == self.max,
            None => true,
        };
        if degenerate {
            return Err(JoydriveError::InvalidCalibrationRange {
                min: self.min,
                center: self.center,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Per-axis calibration plus the global calibrated flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationProfile {
    pub x: AxisCalibration,
    pub y: AxisCalibration,
    calibrated: bool,
}

impl CalibrationProfile {
    /// Device defaults: full range, midpoint center, not calibrated.
    #[must_use]
    pub fn uncalibrated(adc: AdcRange) -> Self {
        Self {
            x: AxisCalibration::full_range(adc),
            y: AxisCalibration::full_range(adc),
            calibrated: false,
        }
    }

    /// A profile that is already marked calibrated.
    ///
    /// # Examples
    ///
    /// ```
    /// use joydrive::joystick::calibration::{AxisCalibration, CalibrationProfile};
    ///
    /// let axis = AxisCalibration { min: 0, center: 500, max: 1000 };
    /// let profile = CalibrationProfile::calibrated(axis, axis);
    /// assert!(profile.is_calibrated());
    /// ```
    #[must_use]
    pub fn calibrated(x: AxisCalibration, y: AxisCalibration) -> Self {
        Self {
            x,
            y,
            calibrated: true,
        }
    }

    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    #[must_use]
    pub fn axis(&self, axis: Axis) -> &AxisCalibration {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }

    fn axis_mut(&mut self, axis: Axis) -> &mut AxisCalibration {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }
}

/// Which calibration phase produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Center,
    Range,
}

/// Outcome of one calibration phase.
#[derive(Debug)]
pub struct CalibrationReport {
    pub phase: CalibrationPhase,
    /// Sampling rounds taken (each round reads both axes)
    pub samples: u32,
    pub valid_x: u32,
    pub valid_y: u32,
    /// Non-fatal problems found during the phase
    pub warnings: Vec<JoydriveError>,
}

impl CalibrationReport {
    fn new(phase: CalibrationPhase) -> Self {
        Self {
            phase,
            samples: 0,
            valid_x: 0,
            valid_y: 0,
            warnings: Vec::new(),
        }
    }

    /// Valid sample count for `axis`.
    #[must_use]
    pub fn valid(&self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.valid_x,
            Axis::Y => self.valid_y,
        }
    }

    fn count_valid(&mut self, axis: Axis) {
        match axis {
            Axis::X => self.valid_x += 1,
            Axis::Y => self.valid_y += 1,
        }
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Running sum of in-range center samples for one axis.
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: i64,
    count: u32,
}

/// Runs the two startup calibration phases against a signal source.
#[derive(Debug, Clone)]
pub struct Calibrator {
    config: CalibrationConfig,
    adc: AdcRange,
}

impl Calibrator {
    #[must_use]
    pub fn new(config: CalibrationConfig, adc: AdcRange) -> Self {
        Self { config, adc }
    }

    /// Samples the resting stick and stores the per-axis average as center.
    ///
    /// Blocks for the settle time plus `center_samples * center_sample_delay_ms`.
    /// Integer division truncates. An axis with fewer than `min_valid_percent`
    /// valid samples keeps the ADC midpoint and is reported as degraded.
    pub fn calibrate_center<S, C>(
        &self,
        source: &mut S,
        clock: &C,
        profile: &mut CalibrationProfile,
    ) -> CalibrationReport
    where
        S: SignalSource + ?Sized,
        C: Clock + ?Sized,
    {
        info!("Joystick calibration: keep the stick centered");
        clock.sleep_ms(self.config.center_settle_ms);

        let mut report = CalibrationReport::new(CalibrationPhase::Center);
        let mut acc = [Accumulator::default(); 2];

        for _ in 0..self.config.center_samples {
            for (slot, axis) in Axis::ALL.into_iter().enumerate() {
                match self.sample(source, axis) {
                    Ok(value) => {
                        acc[slot].sum += i64::from(value);
                        acc[slot].count += 1;
                        report.count_valid(axis);
                    }
                    Err(e) => debug!("Discarding center sample: {}", e),
                }
            }
            report.samples += 1;
            clock.sleep_ms(self.config.center_sample_delay_ms);
        }

        for (slot, axis) in Axis::ALL.into_iter().enumerate() {
            let Accumulator { sum, count } = acc[slot];
            let enough = u64::from(count) * 100
                >= u64::from(report.samples) * u64::from(self.config.min_valid_percent);

            let center = if enough && count > 0 {
                (sum / i64::from(count)) as i32
            } else {
                let fallback = self.adc.midpoint();
                let reason = format!(
                    "only {} of {} center samples valid, using default center {}",
                    count, report.samples, fallback
                );
                warn!("Calibration degraded on {} axis: {}", axis, reason);
                report
                    .warnings
                    .push(JoydriveError::CalibrationDegraded { axis, reason });
                fallback
            };

            profile.axis_mut(axis).center = center;
        }

        info!(
            x_center = profile.x.center,
            y_center = profile.y.center,
            "Center calibration complete"
        );
        report
    }

    /// Tracks the stick's extremes for `range_duration_ms` and marks the
    /// profile calibrated.
    ///
    /// `min` and `max` start at the calibrated center. The profile is marked
    /// calibrated even when the swept span is narrow; that case is only a
    /// warning.
    pub fn calibrate_range<S, C>(
        &self,
        source: &mut S,
        clock: &C,
        profile: &mut CalibrationProfile,
    ) -> CalibrationReport
    where
        S: SignalSource + ?Sized,
        C: Clock + ?Sized,
    {
        info!("Joystick calibration: move the stick to all extremes");
        clock.sleep_ms(self.config.range_prompt_ms);

        for axis in Axis::ALL {
            let cal = profile.axis_mut(axis);
            cal.min = cal.center;
            cal.max = cal.center;
        }

        let mut report = CalibrationReport::new(CalibrationPhase::Range);
        let start = clock.now_ms();

        while elapsed_ms(clock.now_ms(), start) < self.config.range_duration_ms {
            for axis in Axis::ALL {
                match self.sample(source, axis) {
                    Ok(value) => {
                        let cal = profile.axis_mut(axis);
                        cal.min = cal.min.min(value);
                        cal.max = cal.max.max(value);
                        report.count_valid(axis);
                    }
                    Err(e) => debug!("Discarding range sample: {}", e),
                }
            }
            report.samples += 1;
            clock.sleep_ms(self.config.range_sample_interval_ms);
        }

        profile.calibrated = true;

        for axis in Axis::ALL {
            let cal = *profile.axis(axis);
            let span = i64::from(cal.max) - i64::from(cal.min);

            if span * 100 < self.adc.span() * i64::from(self.config.min_range_percent) {
                let reason = format!(
                    "swept span {} is below {}% of the ADC range",
                    span, self.config.min_range_percent
                );
                warn!("Calibration degraded on {} axis: {}", axis, reason);
                report
                    .warnings
                    .push(JoydriveError::CalibrationDegraded { axis, reason });
            }

            if let Err(e) = cal.validate() {
                warn!("{} axis: {}", axis, e);
                report.warnings.push(e);
            }
        }

        info!(
            x_min = profile.x.min,
            x_center = profile.x.center,
            x_max = profile.x.max,
            y_min = profile.y.min,
            y_center = profile.y.center,
            y_max = profile.y.max,
            "Range calibration complete"
        );
        report
    }

    fn sample<S: SignalSource + ?Sized>(&self, source: &mut S, axis: Axis) -> Result<i32> {
        let value = source.read_axis(axis)?;
        self.adc.check(axis, value)
    }
}
