//! # Normalization Module
//!
//! Converts raw ADC samples into a signed output range centered on the
//! calibrated rest position.
//!
//! The two halves of an axis are mapped independently:
//!
//! | Raw sample | Mapping |
//! |------------|---------|
//! | `raw >= center` | `[center, max] -> [0, max_output]` |
//! | `raw < center` | `[min, center] -> [min_output, 0]` |
//!
//! so the response is zero at rest and continuous even when the stick's two
//! half-travels differ in width. A half with zero width maps to 0.

use super::calibration::AxisCalibration;

/// Linearly remaps `value` from `[in_min, in_max]` to `[out_min, out_max]`.
///
/// Integer arithmetic, truncating toward zero. Callers must ensure
/// `in_min != in_max`.
///
/// # Examples
///
/// ```
/// use joydrive::joystick::normalize::remap;
///
/// assert_eq!(remap(750, 500, 1000, 0, 100), 50);
/// assert_eq!(remap(50, 0, 100, 0, 255), 127);
/// ```
#[inline]
#[must_use]
pub fn remap(value: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    let scaled = (i64::from(value) - i64::from(in_min))
        * (i64::from(out_max) - i64::from(out_min))
        / (i64::from(in_max) - i64::from(in_min));
    (scaled + i64::from(out_min)).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Maps raw samples into `[min_output, max_output]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    min_output: i32,
    max_output: i32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            min_output: -100,
            max_output: 100,
        }
    }
}

impl Normalizer {
    #[must_use]
    pub fn new(min_output: i32, max_output: i32) -> Self {
        Self {
            min_output,
            max_output,
        }
    }

    #[must_use]
    pub fn min_output(&self) -> i32 {
        self.min_output
    }

    #[must_use]
    pub fn max_output(&self) -> i32 {
        self.max_output
    }

    /// Maps `raw` through one axis' calibration.
    ///
    /// `center` is first clamped into `[min, max]`. Inverted bounds
    /// (`min > max`) cannot be mapped and yield 0. The result is always
    /// clamped to the output range.
    ///
    /// # Examples
    ///
    /// ```
    /// use joydrive::joystick::normalize::Normalizer;
    ///
    /// let n = Normalizer::new(-100, 100);
    /// assert_eq!(n.map_to_range(750, 0, 1000, 500), 50);
    /// assert_eq!(n.map_to_range(250, 0, 1000, 500), -50);
    /// assert_eq!(n.map_to_range(500, 0, 1000, 500), 0);
    /// ```
    #[must_use]
    pub fn map_to_range(&self, raw: i32, min: i32, max: i32, center: i32) -> i32 {
        if min > max {
            return 0;
        }
        let center = center.clamp(min, max);

        let mapped = if raw >= center {
            if max == center {
                0
            } else {
                remap(raw, center, max, 0, self.max_output)
            }
        } else if min == center {
            0
        } else {
            remap(raw, min, center, self.min_output, 0)
        };

        mapped.clamp(self.min_output, self.max_output)
    }

    /// [`map_to_range`](Self::map_to_range) using a stored axis calibration.
    #[must_use]
    pub fn normalize(&self, raw: i32, cal: &AxisCalibration) -> i32 {
        self.map_to_range(raw, cal.min, cal.max, cal.center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(-100, 100)
    }

    // ==================== Remap Tests ====================

    #[test]
    fn test_remap_endpoints() {
        assert_eq!(remap(0, 0, 100, 0, 255), 0);
        assert_eq!(remap(100, 0, 100, 0, 255), 255);
    }

    #[test]
    fn test_remap_truncates_toward_zero() {
        // 499 * 100 / 500 = 99.8
        assert_eq!(remap(499, 0, 500, 0, 100), 99);
        // (1 - 500) * 100 / 500 = -99.8 -> -99
        assert_eq!(remap(1, 500, 1000, 0, 100), -99);
    }

    #[test]
    fn test_remap_speed_band() {
        // Speed dead zone 10 maps to the motor's minimum useful percentage
        assert_eq!(remap(10, 10, 100, 30, 100), 30);
        assert_eq!(remap(100, 10, 100, 30, 100), 100);
        assert_eq!(remap(55, 10, 100, 30, 100), 65);
    }

    // ==================== Half-range Mapping Tests ====================

    #[test]
    fn test_upper_half_midpoint() {
        assert_eq!(normalizer().map_to_range(750, 0, 1000, 500), 50);
    }

    #[test]
    fn test_lower_half_midpoint() {
        assert_eq!(normalizer().map_to_range(250, 0, 1000, 500), -50);
    }

    #[test]
    fn test_zero_at_center() {
        assert_eq!(normalizer().map_to_range(500, 0, 1000, 500), 0);
        assert_eq!(normalizer().map_to_range(333, 100, 900, 333), 0);
    }

    #[test]
    fn test_full_deflection() {
        assert_eq!(normalizer().map_to_range(1000, 0, 1000, 500), 100);
        assert_eq!(normalizer().map_to_range(0, 0, 1000, 500), -100);
    }

    #[test]
    fn test_asymmetric_halves() {
        // Narrow lower half, wide upper half
        let n = normalizer();
        assert_eq!(n.map_to_range(300, 200, 1000, 400), -50);
        assert_eq!(n.map_to_range(700, 200, 1000, 400), 50);
    }

    #[test]
    fn test_clamps_out_of_range_raw() {
        let n = normalizer();
        assert_eq!(n.map_to_range(1500, 0, 1000, 500), 100);
        assert_eq!(n.map_to_range(-300, 0, 1000, 500), -100);
    }

    #[test]
    fn test_center_clamped_into_bounds() {
        // Center above max behaves as center == max
        let n = normalizer();
        assert_eq!(n.map_to_range(800, 0, 800, 950), 0);
        assert_eq!(n.map_to_range(400, 0, 800, 950), -50);
    }

    // ==================== Degenerate Range Tests ====================

    #[test]
    fn test_degenerate_upper_half() {
        let n = normalizer();
        assert_eq!(n.map_to_range(500, 0, 500, 500), 0);
        assert_eq!(n.map_to_range(900, 0, 500, 500), 0);
        // Lower half still works
        assert_eq!(n.map_to_range(250, 0, 500, 500), -50);
    }

    #[test]
    fn test_degenerate_lower_half() {
        let n = normalizer();
        assert_eq!(n.map_to_range(100, 500, 1000, 500), 0);
        assert_eq!(n.map_to_range(750, 500, 1000, 500), 50);
    }

    #[test]
    fn test_collapsed_axis() {
        let n = normalizer();
        for raw in [0, 500, 1023] {
            assert_eq!(n.map_to_range(raw, 500, 500, 500), 0);
        }
    }

    #[test]
    fn test_inverted_bounds_yield_zero() {
        let n = normalizer();
        assert_eq!(n.map_to_range(100, 900, 100, 500), 0);
        assert_eq!(n.map_to_range(950, 900, 100, 500), 0);
    }

    // ==================== Property Tests ====================

    #[test]
    fn test_monotonic_and_bounded() {
        let n = normalizer();
        for (min, center, max) in [(0, 512, 1023), (40, 300, 1000), (0, 0, 1023), (100, 1023, 1023)] {
            let mut previous = i32::MIN;
            for raw in -50..1100 {
                let out = n.map_to_range(raw, min, max, center);
                assert!(out >= previous, "not monotonic at raw={} for {:?}", raw, (min, center, max));
                assert!((-100..=100).contains(&out));
                previous = out;
            }
            assert_eq!(n.map_to_range(center, min, max, center), 0);
        }
    }

    #[test]
    fn test_wider_output_range() {
        let n = Normalizer::new(-1000, 1000);
        assert_eq!(n.map_to_range(750, 0, 1000, 500), 500);
        assert_eq!(n.min_output(), -1000);
        assert_eq!(n.max_output(), 1000);
    }

    #[test]
    fn test_normalize_with_axis_calibration() {
        let cal = AxisCalibration {
            min: 0,
            center: 500,
            max: 1000,
        };
        assert_eq!(normalizer().normalize(750, &cal), 50);
    }
}
