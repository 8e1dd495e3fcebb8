//! Implementation floating formats and their rounding.

use serde::{Deserialize, Serialize};

use crate::rounding::next_up;

/// Extra ulps granted to libm transcendental functions on top of rounding.
pub const LIBM_ULPS: u32 = 2;

/// Floating-point format of the instrumented implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FloatFormat {
    /// IEEE-754 binary32.
    Single,
    /// IEEE-754 binary64.
    #[default]
    Double,
}

impl FloatFormat {
    /// Number of significand bits, hidden bit included.
    pub fn precision_bits(self) -> u32 {
        match self {
            FloatFormat::Single => 24,
            FloatFormat::Double => 53,
        }
    }

    /// Rounds a binary64 value to the nearest value of this format.
    ///
    /// Results of `+ - * / sqrt` evaluated in binary64 and rounded once to
    /// binary32 are correctly rounded, so single precision programs are
    /// reproduced exactly for those operations.
    pub fn round(self, value: f64) -> f64 {
        match self {
            FloatFormat::Single => value as f32 as f64,
            FloatFormat::Double => value,
        }
    }

    /// Whether `value` is exactly representable in this format.
    pub fn represents(self, value: f64) -> bool {
        self.round(value) == value || value.is_nan()
    }

    /// Upper bound on the rounding error of any result of magnitude at most
    /// `magnitude`, subnormals included.
    pub fn half_ulp(self, magnitude: f64) -> f64 {
        let magnitude = magnitude.abs();
        if magnitude.is_nan() || magnitude == f64::INFINITY {
            return f64::INFINITY;
        }
        match self {
            FloatFormat::Double => {
                let ulp = next_up(magnitude) - magnitude;
                (ulp * 0.5).max(f64::from_bits(1))
            }
            FloatFormat::Single => {
                if magnitude > f32::MAX as f64 {
                    return f64::INFINITY;
                }
                let mut narrowed = magnitude as f32;
                if (narrowed as f64) < magnitude {
                    narrowed = f32::from_bits(narrowed.to_bits() + 1);
                }
                if narrowed.is_infinite() {
                    return f64::INFINITY;
                }
                let above = f32::from_bits(narrowed.to_bits() + 1);
                let ulp = (above as f64) - (narrowed as f64);
                (ulp * 0.5).max(f32::from_bits(1) as f64)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_ulp_matches_epsilon_at_one() {
        assert_eq!(FloatFormat::Double.half_ulp(1.0), f64::EPSILON / 2.0);
        assert_eq!(
            FloatFormat::Single.half_ulp(1.0),
            f32::EPSILON as f64 / 2.0
        );
    }

    #[test]
    fn single_rounding_is_visible() {
        assert!(!FloatFormat::Single.represents(0.1));
        assert!(FloatFormat::Double.represents(0.1));
    }
}
