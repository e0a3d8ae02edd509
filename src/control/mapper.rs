//! # Control Mapper Module
//!
//! Maps a [`NormalizedPosition`] to a [`MotorCommand`].
//!
//! ## Axis Assignments
//!
//! | Axis | Range | Function |
//! |------|-------|----------|
//! | X | `-full_scale..=full_scale` | Direction (negative Backward, positive Forward) |
//! | Y | `0..=full_scale` | Speed (negative values are treated as 0) |
//!
//! `full_scale` is the joystick's `max_output` (100 by default). Both dead
//! zones are configured in percent of that travel, so they keep their meaning
//! when the output range is widened.
//!
//! ## Usage
//!
//! ```
//! use joydrive::config::{ControlConfig, MotorConfig};
//! use joydrive::control::ControlMapper;
//! use joydrive::joystick::NormalizedPosition;
//! use joydrive::motor::Direction;
//!
//! let mut mapper = ControlMapper::new(&ControlConfig::default(), &MotorConfig::default(), 100);
//! let command = mapper.process(&NormalizedPosition { x: 50, y: 100 });
//!
//! assert_eq!(command.direction, Direction::Forward);
//! assert_eq!(command.speed_percent, 100);
//! assert_eq!(command.speed_pwm, 255);
//! assert!(command.changed);
//! ```

use serde::Serialize;
use tracing::info;

use crate::config::{ControlConfig, MotorConfig};
use crate::joystick::normalize::remap;
use crate::joystick::NormalizedPosition;
use crate::motor::Direction;

/// Desired motor action for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MotorCommand {
    pub direction: Direction,
    /// 0-100
    pub speed_percent: i32,
    /// Duty cycle in the motor's speed range
    pub speed_pwm: i32,
    /// Differs meaningfully from the last command that was flagged changed
    pub changed: bool,
}

/// Direction/speed policy with change hysteresis.
#[derive(Debug, Clone)]
pub struct ControlMapper {
    full_scale: i32,
    direction_dead_zone: i32,
    speed_dead_zone: i32,
    min_motor_speed_percent: i32,
    change_threshold_percent: i32,
    min_speed: i32,
    max_speed: i32,
    last_command: MotorCommand,
}

impl ControlMapper {
    /// Creates a mapper for positions in `[-full_scale, full_scale]`.
    ///
    /// Expects a configuration that passed `Config::validate`: a speed dead
    /// zone below 100% and `min_speed < max_speed`.
    #[must_use]
    pub fn new(control: &ControlConfig, motor: &MotorConfig, full_scale: i32) -> Self {
        debug_assert!(full_scale > 0, "full_scale must be positive");
        debug_assert!(
            (0..100).contains(&control.speed_dead_zone),
            "speed_dead_zone must be below 100%"
        );
        debug_assert!(motor.min_speed < motor.max_speed, "min_speed must be below max_speed");

        let full_scale = full_scale.max(1);
        let scale = |percent: i32| remap(percent, 0, 100, 0, full_scale);

        Self {
            full_scale,
            direction_dead_zone: scale(control.direction_dead_zone),
            speed_dead_zone: scale(control.speed_dead_zone),
            min_motor_speed_percent: control.min_motor_speed_percent,
            change_threshold_percent: control.change_threshold_percent,
            min_speed: motor.min_speed,
            max_speed: motor.max_speed,
            last_command: MotorCommand::default(),
        }
    }

    /// Maps one position to a command.
    ///
    /// The reference for change detection only moves when a command is
    /// flagged changed, so slow drift below the threshold never accumulates
    /// into a new command.
    pub fn process(&mut self, position: &NormalizedPosition) -> MotorCommand {
        let direction = self.determine_direction(position.x);
        let speed_percent = self.calculate_speed(position.y);

        let mut command = MotorCommand {
            direction,
            speed_percent,
            speed_pwm: self.percent_to_pwm(speed_percent),
            changed: false,
        };
        command.changed = self.has_changed(&command);

        if command.changed {
            info!(
                "Command: {:?} at {}% (PWM {})",
                command.direction, command.speed_percent, command.speed_pwm
            );
            self.last_command = command;
        }

        command
    }

    /// Last command that was flagged changed.
    #[must_use]
    pub fn last_command(&self) -> MotorCommand {
        self.last_command
    }

    fn determine_direction(&self, x: i32) -> Direction {
        if x.abs() < self.direction_dead_zone {
            Direction::Stop
        } else if x > 0 {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }

    fn calculate_speed(&self, y: i32) -> i32 {
        if y < self.speed_dead_zone {
            return 0;
        }

        if self.speed_dead_zone >= self.full_scale {
            return 100;
        }

        remap(
            y,
            self.speed_dead_zone,
            self.full_scale,
            self.min_motor_speed_percent,
            100,
        )
        .clamp(0, 100)
    }

    fn percent_to_pwm(&self, percent: i32) -> i32 {
        remap(percent, 0, 100, self.min_speed, self.max_speed)
    }

    fn has_changed(&self, command: &MotorCommand) -> bool {
        command.direction != self.last_command.direction
            || (command.speed_percent - self.last_command.speed_percent).abs()
                > self.change_threshold_percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> ControlMapper {
        ControlMapper::new(&ControlConfig::default(), &MotorConfig::default(), 100)
    }

    fn pos(x: i32, y: i32) -> NormalizedPosition {
        NormalizedPosition { x, y }
    }

    // ==================== Direction Tests ====================

    #[test]
    fn test_direction_dead_zone() {
        let mut mapper = mapper();
        for x in -14..=14 {
            assert_eq!(mapper.process(&pos(x, 50)).direction, Direction::Stop);
        }
    }

    #[test]
    fn test_direction_sign() {
        let mut mapper = mapper();
        assert_eq!(mapper.process(&pos(15, 0)).direction, Direction::Forward);
        assert_eq!(mapper.process(&pos(-15, 0)).direction, Direction::Backward);
        assert_eq!(mapper.process(&pos(100, 0)).direction, Direction::Forward);
        assert_eq!(mapper.process(&pos(-100, 0)).direction, Direction::Backward);
    }

    // ==================== Speed Tests ====================

    #[test]
    fn test_small_throttle_is_zero_speed() {
        let mut mapper = mapper();
        let command = mapper.process(&pos(0, 5));
        assert_eq!(command.speed_percent, 0);
        assert_eq!(command.speed_pwm, 0);
    }

    #[test]
    fn test_negative_throttle_is_zero_speed() {
        let mut mapper = mapper();
        let command = mapper.process(&pos(80, -100));
        assert_eq!(command.direction, Direction::Forward);
        assert_eq!(command.speed_percent, 0);
    }

    #[test]
    fn test_speed_curve_endpoints() {
        let mut mapper = mapper();
        // Just out of the dead zone jumps to the minimum useful speed
        assert_eq!(mapper.process(&pos(0, 10)).speed_percent, 30);
        assert_eq!(mapper.process(&pos(0, 100)).speed_percent, 100);
        // 30 + (55 - 10) * 70 / 90 = 65
        assert_eq!(mapper.process(&pos(0, 55)).speed_percent, 65);
    }

    #[test]
    fn test_speed_bounded() {
        let mut mapper = mapper();
        for y in -100..=100 {
            let command = mapper.process(&pos(50, y));
            assert!((0..=100).contains(&command.speed_percent));
            assert!((0..=255).contains(&command.speed_pwm));
        }
    }

    #[test]
    fn test_pwm_follows_percent() {
        let mut mapper = mapper();
        let command = mapper.process(&pos(50, 10));
        // 30% of 255
        assert_eq!(command.speed_pwm, 76);
    }

    // ==================== Change Detection Tests ====================

    #[test]
    fn test_neutral_start_is_unchanged() {
        let mut mapper = mapper();
        assert!(!mapper.process(&pos(0, 0)).changed);
        assert_eq!(mapper.last_command(), MotorCommand::default());
    }

    #[test]
    fn test_direction_change_flags_changed() {
        let mut mapper = mapper();
        assert!(mapper.process(&pos(50, 0)).changed);
        assert!(!mapper.process(&pos(60, 0)).changed);
        assert!(mapper.process(&pos(-50, 0)).changed);
    }

    #[test]
    fn test_hysteresis_threshold() {
        let mut mapper = mapper();
        let first = mapper.process(&pos(50, 55));
        assert!(first.changed);
        assert_eq!(first.speed_percent, 65);

        // 65 -> 70 is a delta of 5: not changed
        let y_for_70 = 10 + (70 - 30) * 90 / 70 + 1;
        let small = mapper.process(&pos(50, y_for_70));
        assert_eq!(small.speed_percent, 70);
        assert!(!small.changed);
        assert_eq!(mapper.last_command().speed_percent, 65);

        // 65 -> 71 is a delta of 6: changed
        let big = mapper.process(&pos(50, y_for_70 + 2));
        assert!(big.speed_percent - 65 > 5);
        assert!(big.changed);
        assert_eq!(mapper.last_command(), big);
    }

    #[test]
    fn test_drift_does_not_accumulate() {
        let mut mapper = mapper();
        mapper.process(&pos(50, 55));
        let reference = mapper.last_command();

        // Several small steps, each within the threshold of the reference
        for y in [56, 57, 58, 59, 60] {
            let command = mapper.process(&pos(50, y));
            assert!(!command.changed);
        }
        assert_eq!(mapper.last_command(), reference);
    }

    // ==================== Output Range Tests ====================

    fn wide_mapper() -> ControlMapper {
        ControlMapper::new(&ControlConfig::default(), &MotorConfig::default(), 1000)
    }

    #[test]
    fn test_wide_range_small_deflection_stays_low() {
        let mut mapper = wide_mapper();
        // 12% of travel on both axes
        let command = mapper.process(&pos(120, 120));
        assert_eq!(command.direction, Direction::Stop);
        // 30 + (120 - 100) * 70 / 900 = 31
        assert_eq!(command.speed_percent, 31);
    }

    #[test]
    fn test_wide_range_dead_zones_scale() {
        let mut mapper = wide_mapper();
        assert_eq!(mapper.process(&pos(149, 99)).direction, Direction::Stop);
        assert_eq!(mapper.process(&pos(149, 99)).speed_percent, 0);
        assert_eq!(mapper.process(&pos(150, 100)).direction, Direction::Forward);
        assert_eq!(mapper.process(&pos(-150, 100)).speed_percent, 30);
    }

    #[test]
    fn test_wide_range_full_deflection() {
        let mut mapper = wide_mapper();
        let command = mapper.process(&pos(-1000, 1000));
        assert_eq!(command.direction, Direction::Backward);
        assert_eq!(command.speed_percent, 100);
        assert_eq!(command.speed_pwm, 255);
        // Halfway: 30 + (550 - 100) * 70 / 900 = 65, same as 55 on the default scale
        assert_eq!(mapper.process(&pos(0, 550)).speed_percent, 65);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "speed_dead_zone")]
    fn test_rejects_full_speed_dead_zone() {
        let control = ControlConfig {
            speed_dead_zone: 100,
            ..ControlConfig::default()
        };
        let _ = ControlMapper::new(&control, &MotorConfig::default(), 100);
    }
}
