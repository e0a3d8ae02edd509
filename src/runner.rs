//! # Control Loop Module
//!
//! Wires the joystick, the control mapper and the motor together and runs
//! them one tick at a time.
//!
//! ## Tick Order
//!
//! 1. Advance any motor ramp in progress
//! 2. Read the filtered joystick position
//! 3. Map it to a command
//! 4. Apply the command if it changed
//! 5. Log a status line every `status_interval_ms`
//!
//! The loop itself never sleeps between ticks; the caller owns the cadence.

use serde::Serialize;
use tracing::{info, warn};

use crate::clock::{elapsed_ms, Clock};
use crate::config::Config;
use crate::control::{ControlMapper, MotorCommand};
use crate::error::Result;
use crate::joystick::calibration::CalibrationReport;
use crate::joystick::source::SignalSource;
use crate::joystick::{Joystick, NormalizedPosition};
use crate::motor::{Direction, MotorController, MotorDriver, MotorState};

/// Everything one tick observed and decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub position: NormalizedPosition,
    pub command: MotorCommand,
    pub motor: MotorState,
}

/// Fields of the periodic status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub speed: i32,
    pub speed_percent: i32,
    pub target_speed: i32,
    pub ramping: bool,
}

/// Joystick-to-motor control loop.
#[derive(Debug)]
pub struct ControlLoop<S, D, C> {
    joystick: Joystick<S, C>,
    mapper: ControlMapper,
    motor: MotorController<D, C>,
    clock: C,
    use_ramp: bool,
    status_interval_ms: u32,
    last_status_ms: u32,
}

impl<S, D, C> ControlLoop<S, D, C>
where
    S: SignalSource,
    D: MotorDriver,
    C: Clock + Clone,
{
    #[must_use]
    pub fn new(
        joystick: Joystick<S, C>,
        mapper: ControlMapper,
        motor: MotorController<D, C>,
        clock: C,
        use_ramp: bool,
        status_interval_ms: u32,
    ) -> Self {
        let last_status_ms = clock.now_ms();
        Self {
            joystick,
            mapper,
            motor,
            clock,
            use_ramp,
            status_interval_ms,
            last_status_ms,
        }
    }

    /// Builds every component from one configuration, sharing `clock`.
    #[must_use]
    pub fn from_config(source: S, driver: D, clock: C, config: &Config) -> Self {
        let joystick = Joystick::new(
            source,
            clock.clone(),
            &config.joystick,
            &config.calibration,
        );
        let mapper = ControlMapper::new(
            &config.control,
            &config.motor,
            config.joystick.max_output,
        );
        let motor = MotorController::new(driver, clock.clone(), &config.motor);

        Self::new(
            joystick,
            mapper,
            motor,
            clock,
            config.runner.use_ramp,
            config.runner.status_interval_ms,
        )
    }

    /// Puts the motor into a known stopped state.
    pub fn begin(&mut self) {
        self.motor.begin();
        info!(
            "Control loop ready (X = direction, Y = speed, ramp {})",
            if self.use_ramp { "on" } else { "off" }
        );
    }

    /// Runs both calibration phases. Blocks for several seconds.
    ///
    /// Warnings in the reports never prevent the joystick from being marked
    /// calibrated. Returns `None` without sampling if the joystick already is.
    pub fn calibrate(&mut self) -> Option<[CalibrationReport; 2]> {
        let reports = self.joystick.calibrate()?;
        let profile = self.joystick.profile();

        if reports.iter().any(CalibrationReport::is_degraded) {
            warn!("Calibration finished with warnings; control may be imprecise");
        }
        info!(
            "Calibration complete: X {}/{}/{}, Y {}/{}/{}",
            profile.x.min,
            profile.x.center,
            profile.x.max,
            profile.y.min,
            profile.y.center,
            profile.y.max
        );

        Some(reports)
    }

    /// Runs one control iteration.
    ///
    /// # Errors
    ///
    /// Returns `SensorFault` when neither axis could be read. The motor keeps
    /// executing the previous command.
    pub fn tick(&mut self) -> Result<Snapshot> {
        self.motor.update();

        let position = match self.joystick.read() {
            Ok(position) => position,
            Err(e) => {
                warn!("Skipping tick: {}", e);
                return Err(e);
            }
        };

        let command = self.mapper.process(&position);
        if command.changed {
            self.apply(&command);
        }

        let snapshot = Snapshot {
            position,
            command,
            motor: self.motor.state(),
        };
        self.report_status(&snapshot);

        Ok(snapshot)
    }

    /// Emergency-stops the motor.
    pub fn shutdown(&mut self) {
        self.motor.emergency_stop();
        info!("Control loop stopped");
    }

    #[must_use]
    pub fn joystick(&self) -> &Joystick<S, C> {
        &self.joystick
    }

    #[must_use]
    pub fn mapper(&self) -> &ControlMapper {
        &self.mapper
    }

    #[must_use]
    pub fn motor(&self) -> &MotorController<D, C> {
        &self.motor
    }

    /// Status line values for `snapshot`.
    #[must_use]
    pub fn status(&self, snapshot: &Snapshot) -> Status {
        let motor = &snapshot.motor;
        Status {
            x: snapshot.position.x,
            y: snapshot.position.y,
            direction: motor.current_direction,
            speed: motor.current_speed,
            speed_percent: self.motor.speed_to_percent(motor.current_speed),
            target_speed: motor.target_speed,
            ramping: motor.ramping,
        }
    }

    fn apply(&mut self, command: &MotorCommand) {
        if command.direction == Direction::Stop || command.speed_percent == 0 {
            self.motor.stop();
        } else if self.use_ramp {
            self.motor
                .move_with_ramp(command.direction, command.speed_pwm);
        } else {
            self.motor.move_to(command.direction, command.speed_pwm);
        }
    }

    fn report_status(&mut self, snapshot: &Snapshot) {
        let now = self.clock.now_ms();
        if elapsed_ms(now, self.last_status_ms) < self.status_interval_ms {
            return;
        }
        self.last_status_ms = now;

        let status = self.status(snapshot);
        if status.ramping {
            info!(
                x = status.x,
                y = status.y,
                direction = ?status.direction,
                speed = status.speed,
                percent = status.speed_percent,
                target = status.target_speed,
                "Status (ramping)"
            );
        } else {
            info!(
                x = status.x,
                y = status.y,
                direction = ?status.direction,
                speed = status.speed,
                percent = status.speed_percent,
                "Status"
            );
        }
    }
}
