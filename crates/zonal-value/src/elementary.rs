//! Enclosures of the elementary functions and their derivatives.
//!
//! Libm results are trusted to [`LIBM_ULPS`] ulps; every enclosure widens
//! them accordingly. Derivative enclosures only feed linearization
//! remainders and are widened by a few extra ulps.

use std::f64::consts::{FRAC_PI_2, LN_10, PI};

use zonal_core::rounding::{div_down, div_up, next_up, sqrt_down, sqrt_up, widen_down, widen_up};
use zonal_core::{Interval, LIBM_ULPS};

const DERIVATIVE_ULPS: u32 = 4;
/// Beyond this magnitude trigonometric enclosures give up on critical points.
const TRIG_LIMIT: f64 = 1.0e15;

/// Univariate function with a known derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elementary {
    /// `1 / x`.
    Recip,
    /// Square root.
    Sqrt,
    /// Cube root.
    Cbrt,
    /// Natural exponential.
    Exp,
    /// Natural logarithm.
    Ln,
    /// Decimal logarithm.
    Log10,
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Tangent.
    Tan,
    /// Arc sine.
    Asin,
    /// Arc cosine.
    Acos,
    /// Arc tangent.
    Atan,
    /// Hyperbolic tangent.
    Tanh,
}

impl Elementary {
    /// Name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Elementary::Recip => "recip",
            Elementary::Sqrt => "sqrt",
            Elementary::Cbrt => "cbrt",
            Elementary::Exp => "exp",
            Elementary::Ln => "ln",
            Elementary::Log10 => "log10",
            Elementary::Sin => "sin",
            Elementary::Cos => "cos",
            Elementary::Tan => "tan",
            Elementary::Asin => "asin",
            Elementary::Acos => "acos",
            Elementary::Atan => "atan",
            Elementary::Tanh => "tanh",
        }
    }

    /// Binary64 evaluation, as the implementation performs it.
    pub fn eval(self, x: f64) -> f64 {
        match self {
            Elementary::Recip => 1.0 / x,
            Elementary::Sqrt => x.sqrt(),
            Elementary::Cbrt => x.cbrt(),
            Elementary::Exp => x.exp(),
            Elementary::Ln => x.ln(),
            Elementary::Log10 => x.log10(),
            Elementary::Sin => x.sin(),
            Elementary::Cos => x.cos(),
            Elementary::Tan => x.tan(),
            Elementary::Asin => x.asin(),
            Elementary::Acos => x.acos(),
            Elementary::Atan => x.atan(),
            Elementary::Tanh => x.tanh(),
        }
    }

    /// Whether the implementation result is correctly rounded.
    pub fn correctly_rounded(self) -> bool {
        matches!(self, Elementary::Recip | Elementary::Sqrt)
    }

    /// Arguments for which the function is defined.
    pub fn domain(self) -> Interval {
        match self {
            Elementary::Sqrt => Interval::new(0.0, f64::INFINITY),
            Elementary::Ln | Elementary::Log10 => Interval::new(f64::from_bits(1), f64::INFINITY),
            Elementary::Asin | Elementary::Acos => Interval::new(-1.0, 1.0),
            _ => Interval::ENTIRE,
        }
    }

    /// Whether `x` holds a point where the function is undefined inside its domain.
    pub fn has_pole(self, x: &Interval) -> bool {
        match self {
            Elementary::Recip => x.contains(0.0),
            Elementary::Tan => {
                x.magnitude() >= TRIG_LIMIT || crosses_lattice(x, FRAC_PI_2, PI).is_some()
            }
            _ => false,
        }
    }

    /// Sound enclosure of the exact function over `x`.
    pub fn enclose(self, x: &Interval) -> Interval {
        if x.is_empty() {
            return Interval::EMPTY;
        }
        match self {
            Elementary::Recip => {
                if x.contains(0.0) {
                    Interval::ENTIRE
                } else {
                    Interval::new(div_down(1.0, x.hi), div_up(1.0, x.lo))
                }
            }
            Elementary::Sqrt => Interval::new(sqrt_down(x.lo.max(0.0)), sqrt_up(x.hi)),
            Elementary::Exp => increasing(self, x).intersect(&Interval::new(0.0, f64::INFINITY)),
            Elementary::Cbrt | Elementary::Ln | Elementary::Log10 | Elementary::Tan | Elementary::Asin => {
                increasing(self, x)
            }
            Elementary::Atan => increasing(self, x).intersect(&Interval::new(-next_up(FRAC_PI_2), next_up(FRAC_PI_2))),
            Elementary::Tanh => increasing(self, x).intersect(&Interval::UNIT),
            Elementary::Acos => Interval::new(
                widen_down(x.hi.acos(), LIBM_ULPS).max(0.0),
                widen_up(x.lo.acos(), LIBM_ULPS),
            ),
            Elementary::Sin => periodic(x, f64::sin, FRAC_PI_2),
            Elementary::Cos => periodic(x, f64::cos, 0.0),
        }
    }

    /// Nearest evaluation of the derivative.
    pub fn derivative_at(self, x: f64) -> f64 {
        match self {
            Elementary::Recip => -1.0 / (x * x),
            Elementary::Sqrt => 0.5 / x.sqrt(),
            Elementary::Cbrt => {
                let root = x.cbrt();
                1.0 / (3.0 * root * root)
            }
            Elementary::Exp => x.exp(),
            Elementary::Ln => 1.0 / x,
            Elementary::Log10 => 1.0 / (x * LN_10),
            Elementary::Sin => x.cos(),
            Elementary::Cos => -x.sin(),
            Elementary::Tan => {
                let t = x.tan();
                1.0 + t * t
            }
            Elementary::Asin => 1.0 / (1.0 - x * x).sqrt(),
            Elementary::Acos => -1.0 / (1.0 - x * x).sqrt(),
            Elementary::Atan => 1.0 / (1.0 + x * x),
            Elementary::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
        }
    }

    /// Enclosure of the derivative over `x`.
    pub fn derivative(self, x: &Interval) -> Interval {
        if x.is_empty() {
            return Interval::EMPTY;
        }
        let mig = x.mignitude();
        let mag = x.magnitude();
        let raw = match self {
            Elementary::Recip => {
                if mig == 0.0 {
                    Interval::new(f64::NEG_INFINITY, 0.0)
                } else {
                    Interval::new(-1.0 / (mig * mig), -1.0 / (mag * mag))
                }
            }
            Elementary::Sqrt => Interval::new(0.5 / x.hi.sqrt(), pole_free(0.5 / x.lo.max(0.0).sqrt())),
            Elementary::Cbrt => {
                let far = mag.cbrt();
                let near = mig.cbrt();
                Interval::new(1.0 / (3.0 * far * far), pole_free(1.0 / (3.0 * near * near)))
            }
            Elementary::Exp => Elementary::Exp.enclose(x),
            Elementary::Ln => Interval::new(1.0 / x.hi, pole_free(1.0 / x.lo.max(0.0))),
            Elementary::Log10 => Interval::new(
                1.0 / (x.hi * LN_10),
                pole_free(1.0 / (x.lo.max(0.0) * LN_10)),
            ),
            Elementary::Sin => Elementary::Cos.enclose(x),
            Elementary::Cos => Elementary::Sin.enclose(x).neg(),
            Elementary::Tan => {
                let t = Elementary::Tan.enclose(x);
                let (low, high) = (t.mignitude(), t.magnitude());
                Interval::new(1.0 + low * low, 1.0 + high * high)
            }
            Elementary::Asin | Elementary::Acos => {
                let near = 1.0 / (1.0 - mig * mig).sqrt();
                let far = pole_free(1.0 / (1.0 - mag * mag).max(0.0).sqrt());
                if self == Elementary::Asin {
                    Interval::new(near, far)
                } else {
                    Interval::new(-far, -near)
                }
            }
            Elementary::Atan => Interval::new(1.0 / (1.0 + mag * mag), 1.0 / (1.0 + mig * mig)),
            Elementary::Tanh => {
                let far = mag.tanh();
                let near = mig.tanh();
                Interval::new((1.0 - far * far).max(0.0), (1.0 - near * near).min(1.0))
            }
        };
        Interval::new(
            widen_down(raw.lo, DERIVATIVE_ULPS),
            widen_up(raw.hi, DERIVATIVE_ULPS),
        )
    }
}

fn pole_free(value: f64) -> f64 {
    if value.is_nan() {
        f64::INFINITY
    } else {
        value
    }
}

fn increasing(f: Elementary, x: &Interval) -> Interval {
    Interval::new(
        widen_down(f.eval(x.lo), LIBM_ULPS),
        widen_up(f.eval(x.hi), LIBM_ULPS),
    )
}

/// First lattice index `k` such that `offset + k·step` may lie inside `x`.
fn crosses_lattice(x: &Interval, offset: f64, step: f64) -> Option<i64> {
    let tolerance = 1.0e-9;
    let first = ((x.lo - offset) / step - tolerance).ceil();
    let last = ((x.hi - offset) / step + tolerance).floor();
    (first <= last).then_some(first as i64)
}

/// Enclosure of `sin` or `cos`, whose extrema sit at `offset + kπ`.
///
/// Even lattice indices are maxima, odd ones minima.
fn periodic(x: &Interval, f: fn(f64) -> f64, offset: f64) -> Interval {
    if !x.is_bounded() || x.magnitude() >= TRIG_LIMIT || x.width() >= 2.0 * PI {
        return Interval::UNIT;
    }
    let at_lo = f(x.lo);
    let at_hi = f(x.hi);
    let mut lo = widen_down(at_lo.min(at_hi), LIBM_ULPS);
    let mut hi = widen_up(at_lo.max(at_hi), LIBM_ULPS);
    let tolerance = 1.0e-9;
    let first = ((x.lo - offset) / PI - tolerance).ceil();
    let last = ((x.hi - offset) / PI + tolerance).floor();
    let mut k = first;
    while k <= last {
        if (k as i64).rem_euclid(2) == 0 {
            hi = 1.0;
        } else {
            lo = -1.0;
        }
        k += 1.0;
    }
    Interval::new(lo.max(-1.0), hi.min(1.0))
}

/// Enclosure of π.
pub(crate) fn pi() -> Interval {
    Interval::new(PI, next_up(PI))
}

/// Enclosure of π/2.
pub(crate) fn half_pi() -> Interval {
    Interval::new(FRAC_PI_2, next_up(FRAC_PI_2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_covers_its_maximum() {
        let x = Interval::new(1.0, 2.0);
        let y = Elementary::Sin.enclose(&x);
        assert_eq!(y.hi, 1.0);
        assert!(y.lo <= 1.0f64.sin());
    }

    #[test]
    fn cosine_of_small_interval_is_tight() {
        let x = Interval::new(0.1, 0.2);
        let y = Elementary::Cos.enclose(&x);
        assert!(y.contains(0.15f64.cos()));
        assert!(y.width() < 0.02);
    }

    #[test]
    fn tangent_poles_are_detected() {
        assert!(Elementary::Tan.has_pole(&Interval::new(1.0, 2.0)));
        assert!(!Elementary::Tan.has_pole(&Interval::new(-1.0, 1.0)));
        assert!(Elementary::Recip.has_pole(&Interval::new(-1.0, 1.0)));
    }

    #[test]
    fn derivative_encloses_pointwise_values() {
        let x = Interval::new(0.5, 2.0);
        for f in [Elementary::Sqrt, Elementary::Exp, Elementary::Ln, Elementary::Atan, Elementary::Tanh] {
            let d = f.derivative(&x);
            for probe in [0.5, 1.0, 1.5, 2.0] {
                assert!(d.contains(f.derivative_at(probe)), "{}", f.name());
            }
        }
    }
}
