//! Closed real intervals with outward-rounded arithmetic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rounding::{add_down, add_up, mul_down, mul_up, next_down, next_up, sub_down, sub_up};

/// Closed interval `[lo, hi]`; empty when `lo > hi`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Lower bound.
    pub lo: f64,
    /// Upper bound.
    pub hi: f64,
}

impl Interval {
    /// The whole extended real line.
    pub const ENTIRE: Interval = Interval {
        lo: f64::NEG_INFINITY,
        hi: f64::INFINITY,
    };

    /// Canonical range of a noise symbol.
    pub const UNIT: Interval = Interval { lo: -1.0, hi: 1.0 };

    /// Canonical empty interval.
    pub const EMPTY: Interval = Interval {
        lo: f64::INFINITY,
        hi: f64::NEG_INFINITY,
    };

    /// Creates an interval; NaN bounds widen to the whole line.
    pub fn new(lo: f64, hi: f64) -> Self {
        Self {
            lo: if lo.is_nan() { f64::NEG_INFINITY } else { lo },
            hi: if hi.is_nan() { f64::INFINITY } else { hi },
        }
    }

    /// Degenerate interval containing a single value.
    pub fn point(value: f64) -> Self {
        Self::new(value, value)
    }

    /// Whether the interval contains no value.
    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    /// Whether the interval holds exactly one value.
    pub fn is_singleton(&self) -> bool {
        self.lo == self.hi
    }

    /// Whether both bounds are finite.
    pub fn is_bounded(&self) -> bool {
        self.lo.is_finite() && self.hi.is_finite()
    }

    /// Whether `value` lies inside the interval.
    pub fn contains(&self, value: f64) -> bool {
        self.lo <= value && value <= self.hi
    }

    /// Whether `other` is a subset of `self`.
    pub fn encloses(&self, other: &Interval) -> bool {
        other.is_empty() || (self.lo <= other.lo && other.hi <= self.hi)
    }

    /// Smallest interval containing both operands.
    pub fn hull(&self, other: &Interval) -> Interval {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Interval {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    /// Intersection of both operands (possibly empty).
    pub fn intersect(&self, other: &Interval) -> Interval {
        Interval {
            lo: self.lo.max(other.lo),
            hi: self.hi.min(other.hi),
        }
    }

    /// Midpoint, computed without overflow.
    pub fn midpoint(&self) -> f64 {
        if self.lo == f64::NEG_INFINITY && self.hi == f64::INFINITY {
            return 0.0;
        }
        if self.lo == f64::NEG_INFINITY {
            return -f64::MAX;
        }
        if self.hi == f64::INFINITY {
            return f64::MAX;
        }
        let mid = self.lo * 0.5 + self.hi * 0.5;
        mid.clamp(self.lo, self.hi)
    }

    /// Upper bound on the distance from the midpoint to either end.
    pub fn radius(&self) -> f64 {
        let mid = self.midpoint();
        sub_up(self.hi, mid).max(sub_up(mid, self.lo))
    }

    /// Upper bound on the width.
    pub fn width(&self) -> f64 {
        sub_up(self.hi, self.lo)
    }

    /// Largest absolute value in the interval.
    pub fn magnitude(&self) -> f64 {
        self.lo.abs().max(self.hi.abs())
    }

    /// Smallest absolute value in the interval.
    pub fn mignitude(&self) -> f64 {
        if self.contains(0.0) {
            0.0
        } else {
            self.lo.abs().min(self.hi.abs())
        }
    }

    /// Outward-rounded sum.
    pub fn add(&self, other: &Interval) -> Interval {
        Interval::new(add_down(self.lo, other.lo), add_up(self.hi, other.hi))
    }

    /// Outward-rounded difference.
    pub fn sub(&self, other: &Interval) -> Interval {
        Interval::new(sub_down(self.lo, other.hi), sub_up(self.hi, other.lo))
    }

    /// Exact negation.
    pub fn neg(&self) -> Interval {
        Interval {
            lo: -self.hi,
            hi: -self.lo,
        }
    }

    /// Outward-rounded product.
    pub fn mul(&self, other: &Interval) -> Interval {
        let candidates_lo = [
            mul_down(self.lo, other.lo),
            mul_down(self.lo, other.hi),
            mul_down(self.hi, other.lo),
            mul_down(self.hi, other.hi),
        ];
        let candidates_hi = [
            mul_up(self.lo, other.lo),
            mul_up(self.lo, other.hi),
            mul_up(self.hi, other.lo),
            mul_up(self.hi, other.hi),
        ];
        let lo = candidates_lo
            .iter()
            .copied()
            .map(|v| if v.is_nan() { f64::NEG_INFINITY } else { v })
            .fold(f64::INFINITY, f64::min);
        let hi = candidates_hi
            .iter()
            .copied()
            .map(|v| if v.is_nan() { f64::INFINITY } else { v })
            .fold(f64::NEG_INFINITY, f64::max);
        Interval::new(lo, hi)
    }

    /// Widens both bounds by one ulp.
    pub fn inflate(&self) -> Interval {
        Interval::new(next_down(self.lo), next_up(self.hi))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:e}, {:e}]", self.lo, self.hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_covers_sign_changes() {
        let a = Interval::new(-2.0, 3.0);
        let b = Interval::new(-1.0, 4.0);
        let p = a.mul(&b);
        assert_eq!(p, Interval::new(-8.0, 12.0));
    }

    #[test]
    fn intersection_of_disjoint_is_empty() {
        let a = Interval::new(0.0, 1.0);
        let b = Interval::new(2.0, 3.0);
        assert!(a.intersect(&b).is_empty());
        assert_eq!(a.hull(&b), Interval::new(0.0, 3.0));
    }
}
