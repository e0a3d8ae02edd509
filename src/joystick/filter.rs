//! # Filter Module
//!
//! Moving-average smoothing followed by dead-zone clamping.
//!
//! The dead zone is applied after smoothing, so a value hovering at the edge
//! of the zone is steadied by the average instead of chattering in and out.

use super::NormalizedPosition;

/// Fixed-depth circular moving average for one axis.
///
/// The first value written after construction or [`reset`](Self::reset)
/// fills the whole window, so a cold start reports that value rather than an
/// average dragged toward zero.
#[derive(Debug, Clone)]
pub struct AxisFilter {
    window: Vec<i32>,
    cursor: usize,
    initialized: bool,
}

impl AxisFilter {
    /// Creates a filter averaging over `depth` samples (at least 1).
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            window: vec![0; depth.max(1)],
            cursor: 0,
            initialized: false,
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.window.len()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Writes `value` into the window and returns the truncating average.
    ///
    /// # Examples
    ///
    /// ```
    /// use joydrive::joystick::filter::AxisFilter;
    ///
    /// let mut filter = AxisFilter::new(3);
    /// assert_eq!(filter.apply(30), 30); // cold start fills the window
    /// assert_eq!(filter.apply(0), 20);  // (0 + 30 + 30) / 3
    /// ```
    pub fn apply(&mut self, value: i32) -> i32 {
        let smoothed = if self.initialized {
            self.window[self.cursor] = value;
            let sum: i64 = self.window.iter().map(|&v| i64::from(v)).sum();
            (sum / self.window.len() as i64) as i32
        } else {
            self.window.fill(value);
            self.initialized = true;
            value
        };

        self.cursor = (self.cursor + 1) % self.window.len();
        smoothed
    }

    /// Forgets history; the next value primes the window again.
    pub fn reset(&mut self) {
        self.window.fill(0);
        self.cursor = 0;
        self.initialized = false;
    }
}

/// Forces values with magnitude below `dead_zone` to exactly 0.
///
/// # Examples
///
/// ```
/// use joydrive::joystick::filter::apply_dead_zone;
///
/// assert_eq!(apply_dead_zone(7, 8), 0);
/// assert_eq!(apply_dead_zone(-8, 8), -8);
/// ```
#[inline]
#[must_use]
pub fn apply_dead_zone(value: i32, dead_zone: i32) -> i32 {
    if value.unsigned_abs() < dead_zone.unsigned_abs() {
        0
    } else {
        value
    }
}

/// Smoothing and dead zone for both axes.
///
/// X and Y keep separate windows but are always written together, so their
/// cursors advance in lockstep once per tick.
#[derive(Debug, Clone)]
pub struct PositionFilter {
    x: AxisFilter,
    y: AxisFilter,
    dead_zone: i32,
}

impl PositionFilter {
    #[must_use]
    pub fn new(depth: usize, dead_zone: i32) -> Self {
        Self {
            x: AxisFilter::new(depth),
            y: AxisFilter::new(depth),
            dead_zone,
        }
    }

    /// Smooths one normalized pair and applies the dead zone.
    pub fn apply(&mut self, x: i32, y: i32) -> NormalizedPosition {
        let x = self.x.apply(x);
        let y = self.y.apply(y);

        NormalizedPosition {
            x: apply_dead_zone(x, self.dead_zone),
            y: apply_dead_zone(y, self.dead_zone),
        }
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.x.is_initialized() && self.y.is_initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== AxisFilter Tests ====================

    #[test]
    fn test_cold_start_returns_first_value() {
        for value in [-100, -7, 0, 42, 100] {
            let mut filter = AxisFilter::new(3);
            assert_eq!(filter.apply(value), value);
            assert!(filter.is_initialized());
        }
    }

    #[test]
    fn test_average_over_window() {
        let mut filter = AxisFilter::new(3);
        filter.apply(90);
        assert_eq!(filter.apply(0), 60); // 90, 0, 90
        assert_eq!(filter.apply(0), 30); // 90, 0, 0
        assert_eq!(filter.apply(0), 0);
    }

    #[test]
    fn test_average_truncates_toward_zero() {
        let mut filter = AxisFilter::new(3);
        filter.apply(-10);
        // (-10 - 10 - 9) / 3 = -9.67
        assert_eq!(filter.apply(-9), -9);

        let mut filter = AxisFilter::new(3);
        filter.apply(10);
        assert_eq!(filter.apply(9), 9);
    }

    #[test]
    fn test_reset_reprimes() {
        let mut filter = AxisFilter::new(4);
        filter.apply(80);
        filter.apply(80);
        filter.reset();
        assert!(!filter.is_initialized());
        assert_eq!(filter.apply(-40), -40);
        assert_eq!(filter.apply(-40), -40);
    }

    #[test]
    fn test_zero_depth_is_promoted() {
        let mut filter = AxisFilter::new(0);
        assert_eq!(filter.depth(), 1);
        filter.apply(5);
        assert_eq!(filter.apply(9), 9);
    }

    #[test]
    fn test_depth_one_passes_through() {
        let mut filter = AxisFilter::new(1);
        for value in [3, -50, 77] {
            assert_eq!(filter.apply(value), value);
        }
    }

    // ==================== Dead Zone Tests ====================

    #[test]
    fn test_dead_zone_inside() {
        for value in -7..=7 {
            assert_eq!(apply_dead_zone(value, 8), 0);
        }
    }

    #[test]
    fn test_dead_zone_boundary_passes() {
        assert_eq!(apply_dead_zone(8, 8), 8);
        assert_eq!(apply_dead_zone(-8, 8), -8);
        assert_eq!(apply_dead_zone(100, 8), 100);
    }

    #[test]
    fn test_dead_zone_idempotent() {
        for value in -100..=100 {
            let once = apply_dead_zone(value, 8);
            assert_eq!(apply_dead_zone(once, 8), once);
        }
    }

    // ==================== PositionFilter Tests ====================

    #[test]
    fn test_position_filter_applies_dead_zone_after_smoothing() {
        let mut filter = PositionFilter::new(3, 8);
        // Cold start at 12 is outside the zone
        assert_eq!(filter.apply(12, 0).x, 12);
        // 12, 12, 0 averages to 8, still outside
        assert_eq!(filter.apply(0, 0).x, 8);
        // 12, 0, 0 averages to 4, inside
        assert_eq!(filter.apply(0, 0).x, 0);
    }

    #[test]
    fn test_position_filter_oscillation_stays_zero() {
        let mut filter = PositionFilter::new(3, 8);
        for i in 0..50 {
            let eps = if i % 2 == 0 { 7 } else { -7 };
            let pos = filter.apply(eps, -eps);
            assert_eq!(pos, NormalizedPosition { x: 0, y: 0 });
        }
    }

    #[test]
    fn test_position_filter_axes_independent() {
        let mut filter = PositionFilter::new(3, 8);
        let pos = filter.apply(60, -90);
        assert_eq!(pos, NormalizedPosition { x: 60, y: -90 });
        let pos = filter.apply(0, -90);
        assert_eq!(pos, NormalizedPosition { x: 40, y: -90 });
    }

    #[test]
    fn test_position_filter_reset() {
        let mut filter = PositionFilter::new(3, 8);
        filter.apply(100, 100);
        filter.reset();
        assert!(!filter.is_initialized());
        assert_eq!(filter.apply(-50, 20), NormalizedPosition { x: -50, y: 20 });
    }
}
