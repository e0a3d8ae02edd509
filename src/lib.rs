//! # Joydrive Library
//!
//! Drive a DC motor from an analog joystick.
//!
//! This library provides the joystick input pipeline (calibration,
//! normalization, smoothing), the position-to-command policy and a ramped
//! H-bridge motor controller, composed into a tick-driven control loop.

pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod joystick;
pub mod motor;
pub mod runner;
pub mod telemetry;
