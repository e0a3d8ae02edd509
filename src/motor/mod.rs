//! # Motor Module
//!
//! DC motor output through an H-bridge.
//!
//! This module handles:
//! - Direction pin truth table and PWM duty writes behind [`MotorDriver`]
//! - Immediate speed/direction commands
//! - Rate-limited speed ramping
//! - Emergency stop

pub mod controller;
pub mod driver;

pub use controller::{MotorController, MotorState};
pub use driver::{Direction, DirectionPins, MotorDriver, TracingDriver};
