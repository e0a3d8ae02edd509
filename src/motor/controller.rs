//! # Motor Controller Module
//!
//! Speed and direction control for one DC motor behind an H-bridge.
//!
//! Two ways to change speed:
//!
//! - **Immediate**: [`MotorController::move_to`], [`MotorController::set_speed`],
//!   [`MotorController::stop`] write the outputs at once.
//! - **Ramped**: [`MotorController::ramp_to`] records a target and
//!   [`MotorController::update`], called every loop iteration, moves toward it
//!   by at most `ramp_step` every `ramp_delay_ms`.
//!
//! ## Ramp states
//!
//! | State | Entered by | Left by |
//! |-------|------------|---------|
//! | Idle | construction, `stop`, `emergency_stop`, reaching the target | `ramp_to` |
//! | Ramping | `ramp_to`, `move_with_ramp` | reaching the target, `stop`, `emergency_stop` |
//!
//! The ramp only manages magnitude; set the direction separately.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::driver::{Direction, DirectionPins, MotorDriver};
use crate::clock::{elapsed_ms, Clock};
use crate::config::MotorConfig;
use crate::joystick::normalize::remap;

/// Snapshot of the actuator's internal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MotorState {
    pub current_speed: i32,
    pub current_direction: Direction,
    pub target_speed: i32,
    pub ramping: bool,
    pub last_ramp_tick: u32,
}

/// Rate-limited H-bridge motor controller.
#[derive(Debug)]
pub struct MotorController<D, C> {
    driver: D,
    clock: C,
    min_speed: i32,
    max_speed: i32,
    ramp_step: i32,
    ramp_delay_ms: u32,
    state: MotorState,
}

impl<D: MotorDriver, C: Clock> MotorController<D, C> {
    /// Creates a controller; no outputs are written until the first command.
    ///
    /// Expects a configuration that passed `Config::validate`:
    /// `0 <= min_speed < max_speed` and a positive `ramp_step`.
    #[must_use]
    pub fn new(driver: D, clock: C, config: &MotorConfig) -> Self {
        debug_assert!(
            0 <= config.min_speed && config.min_speed < config.max_speed,
            "min_speed must be non-negative and below max_speed"
        );
        debug_assert!(config.ramp_step > 0, "ramp_step must be positive");

        let min_speed = config.min_speed.max(0);
        let max_speed = config.max_speed.max(min_speed + 1);

        Self {
            driver,
            clock,
            min_speed,
            max_speed,
            ramp_step: config.ramp_step.max(1),
            ramp_delay_ms: config.ramp_delay_ms,
            state: MotorState::default(),
        }
    }

    /// Drives the outputs to a known stopped state.
    pub fn begin(&mut self) {
        self.stop();
        info!("Motor controller initialized");
    }

    /// Sets speed immediately, clamped to `[min_speed, max_speed]`.
    ///
    /// A resulting speed of 0 also sets the direction to `Stop`.
    pub fn set_speed(&mut self, speed: i32) {
        let speed = speed.clamp(self.min_speed, self.max_speed);
        self.write_speed(speed);

        if speed == 0 {
            self.set_direction(Direction::Stop);
        }
    }

    /// Drives the direction pins.
    pub fn set_direction(&mut self, direction: Direction) {
        self.driver
            .set_direction_pins(DirectionPins::for_direction(direction));
        self.state.current_direction = direction;
    }

    /// Direction then speed, both immediately, bypassing the ramp.
    pub fn move_to(&mut self, direction: Direction, speed: i32) {
        self.set_direction(direction);
        self.set_speed(speed);
        debug!(?direction, speed, "Motor move");
    }

    /// Stops at once and cancels any ramp in progress.
    pub fn stop(&mut self) {
        self.write_speed(0);
        self.set_direction(Direction::Stop);
        self.state.ramping = false;
        self.state.target_speed = 0;
    }

    /// Zeroes the outputs straight through the driver.
    ///
    /// For fault conditions: never ramped and independent of any other
    /// controller state.
    pub fn emergency_stop(&mut self) {
        self.driver.set_duty_cycle(0);
        self.driver
            .set_direction_pins(DirectionPins::for_direction(Direction::Stop));

        self.state.current_speed = 0;
        self.state.current_direction = Direction::Stop;
        self.state.ramping = false;
        self.state.target_speed = 0;

        warn!("Emergency stop");
    }

    /// Starts ramping toward `target_speed` (clamped to the speed range).
    pub fn ramp_to(&mut self, target_speed: i32) {
        self.state.target_speed = target_speed.clamp(self.min_speed, self.max_speed);
        self.state.ramping = true;
        self.state.last_ramp_tick = self.clock.now_ms();
    }

    /// Sets the direction immediately and ramps the speed.
    pub fn move_with_ramp(&mut self, direction: Direction, speed: i32) {
        self.set_direction(direction);
        self.ramp_to(speed);
        debug!(?direction, speed, "Motor ramp");
    }

    /// Advances the ramp by one step if `ramp_delay_ms` has passed.
    ///
    /// Call on every loop iteration; does nothing while idle. Never
    /// overshoots: within one step of the target it lands exactly on it and
    /// goes idle.
    pub fn update(&mut self) {
        if !self.state.ramping {
            return;
        }

        let now = self.clock.now_ms();
        if elapsed_ms(now, self.state.last_ramp_tick) < self.ramp_delay_ms {
            return;
        }

        let target = self.state.target_speed;
        let current = self.state.current_speed;

        let next = if current < target {
            (current + self.ramp_step).min(target)
        } else {
            (current - self.ramp_step).max(target)
        };

        if next == target {
            self.state.ramping = false;
        }

        self.write_speed(next);
        self.state.last_ramp_tick = now;
    }

    #[must_use]
    pub fn current_speed(&self) -> i32 {
        self.state.current_speed
    }

    #[must_use]
    pub fn current_direction(&self) -> Direction {
        self.state.current_direction
    }

    #[must_use]
    pub fn target_speed(&self) -> i32 {
        self.state.target_speed
    }

    #[must_use]
    pub fn is_ramping(&self) -> bool {
        self.state.ramping
    }

    /// Spinning with a direction selected.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.state.current_speed > 0 && self.state.current_direction != Direction::Stop
    }

    #[must_use]
    pub fn state(&self) -> MotorState {
        self.state
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Converts 0-100% to a duty value in the speed range.
    ///
    /// # Examples
    ///
    /// ```
    /// use joydrive::clock::SystemClock;
    /// use joydrive::config::MotorConfig;
    /// use joydrive::motor::{MotorController, TracingDriver};
    ///
    /// let motor = MotorController::new(TracingDriver::new(), SystemClock::new(), &MotorConfig::default());
    /// assert_eq!(motor.percent_to_speed(100), 255);
    /// assert_eq!(motor.percent_to_speed(50), 127);
    /// ```
    #[must_use]
    pub fn percent_to_speed(&self, percent: i32) -> i32 {
        remap(percent.clamp(0, 100), 0, 100, self.min_speed, self.max_speed)
    }

    /// Converts a duty value in the speed range to 0-100%.
    #[must_use]
    pub fn speed_to_percent(&self, speed: i32) -> i32 {
        let speed = speed.clamp(self.min_speed, self.max_speed);
        remap(speed, self.min_speed, self.max_speed, 0, 100)
    }

    fn write_speed(&mut self, speed: i32) {
        let duty = speed.clamp(0, i32::from(u16::MAX)) as u16;
        self.driver.set_duty_cycle(duty);
        self.state.current_speed = speed;
    }
}
