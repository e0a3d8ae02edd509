//! # Joystick Module
//!
//! Analog joystick input pipeline.
//!
//! This module handles:
//! - Sampling the two analog channels through a [`SignalSource`](source::SignalSource)
//! - Startup calibration of center and travel extents
//! - Center-relative normalization into a signed output range
//! - Moving-average smoothing and dead-zone clamping

use serde::Serialize;

pub mod calibration;
pub mod filter;
pub mod normalize;
pub mod reader;
pub mod source;

pub use reader::Joystick;

/// Stick position after calibration, smoothing and dead zone.
///
/// Both coordinates lie in the normalizer's output range (by default
/// `[-100, 100]`); `{0, 0}` is rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NormalizedPosition {
    pub x: i32,
    pub y: i32,
}
