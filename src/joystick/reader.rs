//! # Joystick Reader Module
//!
//! Owns a signal source together with its calibration profile and filter
//! state, and turns raw samples into a [`NormalizedPosition`] once per tick.

use tracing::{debug, warn};

use super::calibration::{CalibrationProfile, CalibrationReport, Calibrator};
use super::filter::PositionFilter;
use super::normalize::Normalizer;
use super::source::{AdcRange, Axis, SignalSource};
use super::NormalizedPosition;
use crate::clock::Clock;
use crate::config::{CalibrationConfig, JoystickConfig};
use crate::error::Result;

/// Calibrated, filtered two-axis joystick.
///
/// Reads return `{0, 0}` until both calibration phases have completed.
#[derive(Debug)]
pub struct Joystick<S, C> {
    source: S,
    clock: C,
    adc: AdcRange,
    calibrator: Calibrator,
    normalizer: Normalizer,
    filter: PositionFilter,
    profile: CalibrationProfile,
}

impl<S: SignalSource, C: Clock> Joystick<S, C> {
    /// Creates an uncalibrated joystick.
    #[must_use]
    pub fn new(
        source: S,
        clock: C,
        joystick: &JoystickConfig,
        calibration: &CalibrationConfig,
    ) -> Self {
        let adc = AdcRange::new(joystick.adc_min, joystick.adc_max);
        Self {
            source,
            clock,
            adc,
            calibrator: Calibrator::new(calibration.clone(), adc),
            normalizer: Normalizer::new(joystick.min_output, joystick.max_output),
            filter: PositionFilter::new(joystick.filter_depth, joystick.dead_zone),
            profile: CalibrationProfile::uncalibrated(adc),
        }
    }

    /// Installs a profile without running the calibration phases.
    ///
    /// Injection hook for tests and for hosts that calibrate elsewhere. The
    /// filter re-primes on the next read.
    #[must_use]
    pub fn with_profile(mut self, profile: CalibrationProfile) -> Self {
        self.profile = profile;
        self.filter.reset();
        self
    }

    /// First calibration phase; see [`Calibrator::calibrate_center`].
    fn calibrate_center(&mut self) -> CalibrationReport {
        self.calibrator
            .calibrate_center(&mut self.source, &self.clock, &mut self.profile)
    }

    /// Second calibration phase; see [`Calibrator::calibrate_range`].
    ///
    /// Resets the filter so stale pre-calibration history is not averaged in.
    fn calibrate_range(&mut self) -> CalibrationReport {
        let report = self
            .calibrator
            .calibrate_range(&mut self.source, &self.clock, &mut self.profile);
        self.filter.reset();
        report
    }

    /// Runs the center phase then the range phase.
    ///
    /// The profile is fixed once calibrated: later calls log a warning, leave
    /// it untouched and return `None`.
    pub fn calibrate(&mut self) -> Option<[CalibrationReport; 2]> {
        if self.profile.is_calibrated() {
            warn!("Joystick already calibrated; keeping the current profile");
            return None;
        }

        let center = self.calibrate_center();
        let range = self.calibrate_range();
        Some([center, range])
    }

    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.profile.is_calibrated()
    }

    #[must_use]
    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    #[must_use]
    pub fn adc_range(&self) -> AdcRange {
        self.adc
    }

    /// Samples both axes and returns the filtered position.
    ///
    /// An axis whose sample faults reads as its calibrated center for this
    /// tick.
    ///
    /// # Errors
    ///
    /// Returns the X axis `SensorFault` when both axes fault; the tick should
    /// then be skipped and the previous command left in place.
    pub fn read(&mut self) -> Result<NormalizedPosition> {
        if !self.profile.is_calibrated() {
            return Ok(NormalizedPosition::default());
        }

        let x = self.sample(Axis::X);
        let y = self.sample(Axis::Y);

        let (x_raw, y_raw) = match (x, y) {
            (Err(e), Err(_)) => return Err(e),
            (x, y) => (self.or_center(Axis::X, x), self.or_center(Axis::Y, y)),
        };

        let x_mapped = self.normalizer.normalize(x_raw, &self.profile.x);
        let y_mapped = self.normalizer.normalize(y_raw, &self.profile.y);

        Ok(self.filter.apply(x_mapped, y_mapped))
    }

    fn sample(&mut self, axis: Axis) -> Result<i32> {
        let value = self.source.read_axis(axis)?;
        self.adc.check(axis, value)
    }

    fn or_center(&self, axis: Axis, sample: Result<i32>) -> i32 {
        sample.unwrap_or_else(|e| {
            debug!("Substituting center for faulted sample: {}", e);
            self.profile.axis(axis).center
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::mocks::ManualClock;
    use crate::error::JoydriveError;
    use crate::joystick::calibration::AxisCalibration;
    use crate::joystick::source::mocks::ScriptedSource;
    use crate::joystick::source::MockSignalSource;

    const AXIS: AxisCalibration = AxisCalibration {
        min: 0,
        center: 500,
        max: 1000,
    };

    fn joystick_config() -> JoystickConfig {
        JoystickConfig {
            adc_max: 1023,
            ..JoystickConfig::default()
        }
    }

    fn calibrated(source: ScriptedSource) -> Joystick<ScriptedSource, ManualClock> {
        Joystick::new(
            source,
            ManualClock::new(),
            &joystick_config(),
            &CalibrationConfig::default(),
        )
        .with_profile(CalibrationProfile::calibrated(AXIS, AXIS))
    }

    fn fault(axis: Axis) -> JoydriveError {
        JoydriveError::SensorFault {
            axis,
            reason: "test".to_string(),
        }
    }

    #[test]
    fn test_uncalibrated_read_is_neutral() {
        let mut source = MockSignalSource::new();
        source.expect_read_axis().never();

        let mut joystick = Joystick::new(
            source,
            ManualClock::new(),
            &joystick_config(),
            &CalibrationConfig::default(),
        );

        assert!(!joystick.is_calibrated());
        assert_eq!(joystick.read().unwrap(), NormalizedPosition { x: 0, y: 0 });
    }

    #[test]
    fn test_read_maps_upper_half() {
        let mut joystick = calibrated(ScriptedSource::constant(750, 500));
        let pos = joystick.read().unwrap();
        assert_eq!(pos, NormalizedPosition { x: 50, y: 0 });
    }

    #[test]
    fn test_read_applies_dead_zone() {
        // 530 -> 6, inside the default dead zone of 8
        let mut joystick = calibrated(ScriptedSource::constant(530, 470));
        assert_eq!(joystick.read().unwrap(), NormalizedPosition { x: 0, y: 0 });
    }

    #[test]
    fn test_read_smooths_across_ticks() {
        let mut source = ScriptedSource::new();
        source.push(1000, 500);
        source.push(500, 500);
        let mut joystick = calibrated(source);

        assert_eq!(joystick.read().unwrap().x, 100);
        // 100, 0, 100 averages to 66
        assert_eq!(joystick.read().unwrap().x, 66);
    }

    #[test]
    fn test_both_axes_faulted_aborts_tick() {
        let mut source = ScriptedSource::new();
        source.push_result(Ok(5000), Ok(-1));
        let mut joystick = calibrated(source);

        let result = joystick.read();
        assert!(matches!(
            result,
            Err(JoydriveError::SensorFault { axis: Axis::X, .. })
        ));
    }

    #[test]
    fn test_single_faulted_axis_reads_as_center() {
        let mut source = ScriptedSource::new();
        source.push_result(Ok(1000), Err(fault(Axis::Y)));
        let mut joystick = calibrated(source);

        assert_eq!(joystick.read().unwrap(), NormalizedPosition { x: 100, y: 0 });
    }

    #[test]
    fn test_full_calibration_then_read() {
        let mut source = ScriptedSource::new();
        // Center phase: 50 resting samples
        for _ in 0..50 {
            source.push(512, 512);
        }
        // Range phase: sweep, then come back to rest
        source.push(0, 1023);
        source.push(1023, 0);
        source.push(512, 512);

        let clock = ManualClock::new();
        let mut joystick = Joystick::new(
            source,
            clock.clone(),
            &joystick_config(),
            &CalibrationConfig::default(),
        );

        let [center, range] = joystick.calibrate().unwrap();
        assert!(!center.is_degraded());
        assert!(!range.is_degraded());
        assert!(joystick.is_calibrated());
        assert_eq!(
            joystick.profile().x,
            AxisCalibration {
                min: 0,
                center: 512,
                max: 1023
            }
        );
        // 3000 + 50 * 20 + 1000 + 5000
        assert_eq!(clock.now_ms(), 10_000);

        assert_eq!(joystick.read().unwrap(), NormalizedPosition { x: 0, y: 0 });
    }

    #[test]
    fn test_calibrate_keeps_existing_profile() {
        let mut source = MockSignalSource::new();
        source.expect_read_axis().never();
        let clock = ManualClock::new();

        let mut joystick = Joystick::new(
            source,
            clock.clone(),
            &joystick_config(),
            &CalibrationConfig::default(),
        )
        .with_profile(CalibrationProfile::calibrated(AXIS, AXIS));

        assert!(joystick.calibrate().is_none());
        assert_eq!(joystick.profile().x, AXIS);
        assert_eq!(joystick.profile().y, AXIS);
        // No settle or sampling delays were spent
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn test_second_calibration_is_ignored() {
        let mut source = ScriptedSource::new();
        for _ in 0..50 {
            source.push(512, 512);
        }
        source.push(0, 0);
        source.push(1023, 1023);
        source.push(512, 512);
        let clock = ManualClock::new();
        let mut joystick = Joystick::new(
            source,
            clock.clone(),
            &joystick_config(),
            &CalibrationConfig::default(),
        );

        assert!(joystick.calibrate().is_some());
        let profile = *joystick.profile();
        let elapsed = clock.now_ms();

        assert!(joystick.calibrate().is_none());
        assert_eq!(*joystick.profile(), profile);
        assert_eq!(clock.now_ms(), elapsed);
    }
}
