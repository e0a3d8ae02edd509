//! # Control Module
//!
//! Turns a normalized stick position into a motor command.
//!
//! X selects the direction, Y the speed. Small stick movements are ignored
//! and a speed change only counts as a new command once it exceeds the
//! configured threshold.

pub mod mapper;

pub use mapper::{ControlMapper, MotorCommand};
