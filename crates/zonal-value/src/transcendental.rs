//! Mean-value linearization of the elementary functions.

use tracing::warn;
use zonal_affine::{LinearEquation, SymbolKind, SymbolTable};
use zonal_core::rounding::{add_up, mul_up};
use zonal_core::{DomainMode, Interval, ZonalError};
use zonal_flow::Session;

use crate::arith::{infeasible, unbounded, Draft};
use crate::elementary::{half_pi, pi, Elementary};
use crate::zonotope::{RoundingModel, Zonotope};

fn with_remainder(equation: LinearEquation, delta: f64, symbols: &mut SymbolTable) -> LinearEquation {
    if delta == 0.0 {
        equation
    } else if delta.is_finite() {
        equation.add_term(symbols.fresh(SymbolKind::Linearization), delta)
    } else {
        equation.widen(f64::INFINITY)
    }
}

/// Whether the uncorrelated part of a linearization is at least as wide as `hull`.
fn hull_is_tighter(equation: &LinearEquation, delta: f64, hull: &Interval) -> bool {
    let independent = add_up(mul_up(2.0, delta), mul_up(2.0, equation.slack()));
    independent.is_nan() || independent >= hull.width()
}

/// `f(form)` over `range`: `f(c) + α(x − c) + δ·ε`, or the hull of `f` when
/// the remainder alone is wider than the hull.
pub(crate) fn linearize(
    f: Elementary,
    form: &LinearEquation,
    range: Interval,
    symbols: &mut SymbolTable,
) -> LinearEquation {
    let hull = f.enclose(&range);
    if range.is_bounded() {
        let centre = range.midpoint();
        let alpha = f.derivative_at(centre);
        let at_centre = f.enclose(&Interval::point(centre));
        if alpha.is_finite() && at_centre.is_bounded() {
            let spread = range.radius();
            let delta = if spread == 0.0 {
                0.0
            } else {
                let deviation = f.derivative(&range).sub(&Interval::point(alpha)).magnitude();
                mul_up(deviation, spread)
            };
            let base = form
                .add_constant(-centre)
                .scale(alpha)
                .add_constant(at_centre.midpoint())
                .widen(at_centre.radius());
            if !hull_is_tighter(&base, delta, &hull) {
                return with_remainder(base, delta, symbols);
            }
        }
    }
    LinearEquation::interval_form(hull, SymbolKind::Hull, symbols)
}

/// Error of `f` between both domains: `α·E + δ·ε` with the derivative over
/// the hull of the real and implementation ranges.
pub(crate) fn propagate(
    f: Elementary,
    error: &LinearEquation,
    real: Interval,
    implementation: Interval,
    symbols: &mut SymbolTable,
) -> LinearEquation {
    if error.is_constant() && error.constant_term() == 0.0 {
        return LinearEquation::zero();
    }
    let fallback = f.enclose(&implementation).sub(&f.enclose(&real));
    let span = real.hull(&implementation);
    if span.is_bounded() {
        let alpha = f.derivative_at(span.midpoint());
        if alpha.is_finite() {
            let deviation = f.derivative(&span).sub(&Interval::point(alpha)).magnitude();
            let delta = mul_up(deviation, error.magnitude());
            let base = error.scale(alpha);
            if !hull_is_tighter(&base, delta, &fallback) {
                return with_remainder(base, delta, symbols);
            }
        }
    }
    LinearEquation::interval_form(fallback, SymbolKind::Hull, symbols)
}

fn clamp(f: Elementary, range: Interval, half: &str, session: &Session) -> Result<Interval, ZonalError> {
    let domain = f.domain();
    let clamped = range.intersect(&domain);
    if clamped.is_empty() {
        return Err(infeasible(
            session,
            "outside-domain",
            "argument lies outside the function domain",
            f.name(),
        ));
    }
    if !domain.encloses(&range) {
        warn!(function = f.name(), half, %range, "argument clamped to the function domain");
    }
    Ok(clamped)
}

impl Zonotope {
    pub(crate) fn apply(
        &self,
        f: Elementary,
        session: &mut Session,
        model: RoundingModel,
    ) -> Result<Zonotope, ZonalError> {
        let mode = session.mode();
        let mut x = self.halves(mode, f.name())?;
        let both = mode == DomainMode::RealAndImplementation;
        let first = if mode == DomainMode::OnlyImplementation {
            "implementation"
        } else {
            "real"
        };
        x.real_bound = clamp(f, x.real_bound, first, session)?;
        if both {
            x.implementation_bound = clamp(f, x.implementation_bound, "implementation", session)?;
        }
        if f.has_pole(&x.real_bound) || (both && f.has_pole(&x.implementation_bound)) {
            warn!(function = f.name(), range = %x.real_bound, "argument range crosses a pole, result is unbounded");
            return Ok(unbounded(f.eval(x.scalar), session));
        }
        let symbols = session.symbols_mut();
        let real = linearize(f, &x.real, x.real_bound, symbols);
        let real_hint = f.enclose(&x.real_bound);
        let (error, implementation_hint) = if both {
            (
                propagate(f, &x.error, x.real_bound, x.implementation_bound, symbols),
                f.enclose(&x.implementation_bound),
            )
        } else {
            (LinearEquation::zero(), real_hint)
        };
        Ok(Draft {
            real,
            real_hint,
            error,
            implementation_hint,
            scalar: f.eval(x.scalar),
        }
        .finish(session, model))
    }

    fn elementary(&self, f: Elementary, session: &mut Session) -> Result<Zonotope, ZonalError> {
        let model = if f.correctly_rounded() {
            RoundingModel::Arithmetic
        } else {
            RoundingModel::Libm
        };
        self.apply(f, session, model)
    }

    /// Charges a final rounding to a composed value and installs the libm scalar.
    fn rounded_as(&self, scalar: f64, session: &mut Session, model: RoundingModel) -> Result<Zonotope, ZonalError> {
        let x = self.halves(session.mode(), "compose")?;
        Ok(Draft {
            real: x.real,
            real_hint: x.real_bound,
            error: x.error,
            implementation_hint: x.implementation_bound,
            scalar,
        }
        .finish(session, model))
    }

    /// Exact value enclosed by `range` in both domains.
    fn enclosed(range: Interval, session: &Session) -> Zonotope {
        let form = LinearEquation::constant(range.midpoint()).widen(range.radius());
        let bound = form.bounds();
        Zonotope {
            real: form,
            error: LinearEquation::zero(),
            implementation: range.midpoint(),
            real_bound: bound,
            implementation_bound: bound,
            mode: session.mode(),
        }
    }

    /// Square root.
    pub fn sqrt(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.elementary(Elementary::Sqrt, session)
    }

    /// Cube root.
    pub fn cbrt(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.elementary(Elementary::Cbrt, session)
    }

    /// Natural exponential.
    pub fn exp(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.elementary(Elementary::Exp, session)
    }

    /// Natural logarithm.
    pub fn ln(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.elementary(Elementary::Ln, session)
    }

    /// Decimal logarithm.
    pub fn log10(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.elementary(Elementary::Log10, session)
    }

    /// Sine.
    pub fn sin(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.elementary(Elementary::Sin, session)
    }

    /// Cosine.
    pub fn cos(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.elementary(Elementary::Cos, session)
    }

    /// Tangent; a range crossing a pole gives an unbounded result.
    pub fn tan(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.elementary(Elementary::Tan, session)
    }

    /// Arc sine.
    pub fn asin(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.elementary(Elementary::Asin, session)
    }

    /// Arc cosine.
    pub fn acos(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.elementary(Elementary::Acos, session)
    }

    /// Arc tangent.
    pub fn atan(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.elementary(Elementary::Atan, session)
    }

    /// Hyperbolic tangent.
    pub fn tanh(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.elementary(Elementary::Tanh, session)
    }

    /// Integral exponent shared by both domains, if any.
    fn integral_exponent(&self) -> Option<i32> {
        let range = self.min_max();
        if !range.is_singleton() || range.lo.fract() != 0.0 {
            return None;
        }
        let value = range.lo;
        (value.abs() <= f64::from(i32::MAX)).then_some(value as i32)
    }

    fn power(&self, n: i32, session: &mut Session) -> Result<Zonotope, ZonalError> {
        if n == 0 {
            return Ok(Zonotope::constant(1.0, session));
        }
        let mut remaining = n.unsigned_abs();
        let mut base = self.clone();
        let mut result: Option<Zonotope> = None;
        loop {
            if remaining & 1 == 1 {
                result = Some(match result {
                    None => base.clone(),
                    Some(acc) => acc.mul_rounded(&base, session, RoundingModel::Exact)?,
                });
            }
            remaining >>= 1;
            if remaining == 0 {
                break;
            }
            base = base.mul_rounded(&base, session, RoundingModel::Exact)?;
        }
        let positive = match result {
            Some(value) => value,
            None => Zonotope::constant(1.0, session),
        };
        if n > 0 {
            Ok(positive)
        } else {
            Zonotope::constant(1.0, session).div_rounded(&positive, session, RoundingModel::Exact)
        }
    }

    /// `self^n` as computed by repeated multiplication.
    pub fn powi(&self, n: i32, session: &mut Session) -> Result<Zonotope, ZonalError> {
        let scalar = self.implementation.powi(n);
        if n == 0 {
            return Ok(Zonotope::constant(scalar, session));
        }
        let composed = self.power(n, session)?;
        let steps = 2 * (32 - n.unsigned_abs().leading_zeros()) + u32::from(n < 0);
        composed.rounded_as(scalar, session, RoundingModel::HalfUlps(1 + 2 * steps))
    }

    /// `self^exponent` through the libm power function.
    pub fn pow(&self, exponent: &Zonotope, session: &mut Session) -> Result<Zonotope, ZonalError> {
        let scalar = self.implementation.powf(exponent.implementation);
        let composed = match exponent.integral_exponent() {
            Some(0) => return Ok(Zonotope::constant(1.0, session)),
            Some(n) => self.power(n, session)?,
            None => {
                let log = self.apply(Elementary::Ln, session, RoundingModel::Exact)?;
                exponent
                    .mul_rounded(&log, session, RoundingModel::Exact)?
                    .apply(Elementary::Exp, session, RoundingModel::Exact)?
            }
        };
        composed.rounded_as(scalar, session, RoundingModel::Libm)
    }

    /// Two-argument arc tangent of `self / x`.
    ///
    /// The composition follows the sign of `x` or `self` when one of them is
    /// decided over both domains; otherwise the result is the hull `[-π, π]`.
    pub fn atan2(&self, x: &Zonotope, session: &mut Session) -> Result<Zonotope, ZonalError> {
        let scalar = self.implementation.atan2(x.implementation);
        let xs = x.min_max();
        let ys = self.min_max();
        let exact = RoundingModel::Exact;
        let composed = if xs.lo > 0.0 {
            self.div_rounded(x, session, exact)?
                .apply(Elementary::Atan, session, exact)?
        } else if xs.hi < 0.0 && (ys.lo > 0.0 || ys.hi < 0.0) {
            let turn = if ys.lo > 0.0 { pi() } else { pi().neg() };
            let angle = self
                .div_rounded(x, session, exact)?
                .apply(Elementary::Atan, session, exact)?;
            angle.add_rounded(&Zonotope::enclosed(turn, session), session, exact)?
        } else if ys.lo > 0.0 || ys.hi < 0.0 {
            let quarter = if ys.lo > 0.0 { half_pi() } else { half_pi().neg() };
            let angle = x
                .div_rounded(self, session, exact)?
                .apply(Elementary::Atan, session, exact)?
                .neg(session)?;
            angle.add_rounded(&Zonotope::enclosed(quarter, session), session, exact)?
        } else {
            let bound = pi();
            let full = Interval::new(-bound.hi, bound.hi);
            Zonotope::enclosed(full, session)
        };
        composed.rounded_as(scalar, session, RoundingModel::Libm)
    }
}

#[cfg(test)]
mod tests {
    use zonal_core::Settings;

    use super::*;

    #[test]
    fn linearization_keeps_correlation() {
        let mut session = Session::new(Settings::default()).unwrap();
        let x = Zonotope::from_range(1.0, 1.1, &mut session).unwrap();
        let y = x.exp(&mut session).unwrap();
        let input = *x.real_form().unwrap().symbols().iter().next().unwrap();
        assert!(y.real_form().unwrap().coefficient(input) > 0.0);
        let range = y.real_range().unwrap();
        assert!(range.contains(1.0f64.exp()) && range.contains(1.1f64.exp()));
    }

    #[test]
    fn sqrt_at_zero_falls_back_to_the_hull() {
        let mut session = Session::new(Settings::default()).unwrap();
        let x = Zonotope::from_range(0.0, 4.0, &mut session).unwrap();
        let y = x.sqrt(&mut session).unwrap();
        let range = y.real_range().unwrap();
        assert!(range.contains(0.0) && range.contains(2.0));
        assert!(range.hi < 2.0 + 1e-12);
    }
}
