//! Trait abstraction for the H-bridge outputs to enable testing

use serde::Serialize;
use tracing::debug;

/// Commanded rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Direction {
    #[default]
    Stop,
    Forward,
    Backward,
}

/// Logic levels of the two H-bridge direction inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectionPins {
    pub in1: bool,
    pub in2: bool,
}

impl DirectionPins {
    /// H-bridge truth table; `Stop` drives both lines low.
    ///
    /// # Examples
    ///
    /// ```
    /// use joydrive::motor::driver::{Direction, DirectionPins};
    ///
    /// let pins = DirectionPins::for_direction(Direction::Forward);
    /// assert!(pins.in1 && !pins.in2);
    /// assert_eq!(DirectionPins::for_direction(Direction::Stop), DirectionPins::default());
    /// ```
    #[must_use]
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Forward => Self {
                in1: true,
                in2: false,
            },
            Direction::Backward => Self {
                in1: false,
                in2: true,
            },
            Direction::Stop => Self {
                in1: false,
                in2: false,
            },
        }
    }
}

/// Trait for the H-bridge's PWM and direction lines
///
/// Writes are fire-and-forget: an emergency stop must always be able to
/// drive the outputs low.
#[cfg_attr(test, mockall::automock)]
pub trait MotorDriver {
    /// Sets the PWM magnitude line.
    fn set_duty_cycle(&mut self, duty: u16);

    /// Sets the two direction lines.
    fn set_direction_pins(&mut self, pins: DirectionPins);
}

/// Driver for hosts without motor hardware: records the output state and
/// logs every change.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDriver {
    duty: u16,
    pins: DirectionPins,
}

impl TracingDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last duty cycle written.
    #[must_use]
    pub fn duty(&self) -> u16 {
        self.duty
    }

    /// Last direction pin levels written.
    #[must_use]
    pub fn pins(&self) -> DirectionPins {
        self.pins
    }
}

impl MotorDriver for TracingDriver {
    fn set_duty_cycle(&mut self, duty: u16) {
        if duty != self.duty {
            debug!(duty, "PWM duty cycle");
        }
        self.duty = duty;
    }

    fn set_direction_pins(&mut self, pins: DirectionPins) {
        if pins != self.pins {
            debug!(in1 = pins.in1, in2 = pins.in2, "Direction pins");
        }
        self.pins = pins;
    }
}
