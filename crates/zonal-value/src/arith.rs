//! Arithmetic over both domains.

use zonal_affine::{LinearEquation, SymbolKind, SymbolTable};
use zonal_core::rounding::{add_up, sub_down};
use zonal_core::{DomainMode, ErrorInfo, Interval, ZonalError};
use tracing::warn;
use zonal_flow::Session;

use crate::atomic::hull_draft;
use crate::elementary::Elementary;
use crate::transcendental::linearize;
use crate::zonotope::{RoundingModel, Zonotope};

/// Forms of one operand in the session mode.
///
/// In `OnlyImplementation`, `real` holds the implementation form and
/// `real_bound` its bound.
#[derive(Debug, Clone)]
pub(crate) struct Halves {
    pub(crate) real: LinearEquation,
    pub(crate) real_bound: Interval,
    pub(crate) error: LinearEquation,
    pub(crate) implementation_bound: Interval,
    pub(crate) scalar: f64,
}

impl Halves {
    pub(crate) fn implementation(&self, mode: DomainMode) -> LinearEquation {
        match mode {
            DomainMode::RealAndImplementation => self.real.add(&self.error),
            _ => self.real.clone(),
        }
    }
}

/// Unrounded result of an operation, laid out like [`Halves`].
#[derive(Debug, Clone)]
pub(crate) struct Draft {
    pub(crate) real: LinearEquation,
    pub(crate) real_hint: Interval,
    pub(crate) error: LinearEquation,
    pub(crate) implementation_hint: Interval,
    pub(crate) scalar: f64,
}

impl Draft {
    /// Charges the implementation rounding and builds the value.
    pub(crate) fn finish(self, session: &mut Session, model: RoundingModel) -> Zonotope {
        let format = session.format();
        let scalar = model.round(format, self.scalar);
        let mode = session.mode();
        match mode {
            DomainMode::OnlyReal => {
                let real = session.simplify(self.real);
                let real_bound = real.bounds().intersect(&self.real_hint);
                Zonotope {
                    real,
                    error: LinearEquation::zero(),
                    implementation: scalar,
                    real_bound,
                    implementation_bound: Interval::ENTIRE,
                    mode,
                }
            }
            DomainMode::RealAndImplementation => {
                let exact = self.real.add(&self.error);
                let (radius, hint) = rounding(&exact, self.implementation_hint, scalar, session, model);
                let error = with_rounding(self.error, radius, session.symbols_mut());
                let real = session.simplify(self.real);
                let error = session.simplify(error);
                let real_bound = real.bounds().intersect(&self.real_hint);
                let implementation_bound = real.add(&error).bounds().intersect(&hint);
                Zonotope {
                    real,
                    error,
                    implementation: scalar,
                    real_bound,
                    implementation_bound,
                    mode,
                }
            }
            DomainMode::OnlyImplementation => {
                let hint = self.real_hint.intersect(&self.implementation_hint);
                let (radius, hint) = rounding(&self.real, hint, scalar, session, model);
                let shadow = with_rounding(self.real, radius, session.symbols_mut());
                let shadow = session.simplify(shadow);
                let bound = shadow.bounds().intersect(&hint);
                Zonotope {
                    real: shadow,
                    error: LinearEquation::zero(),
                    implementation: scalar,
                    real_bound: bound,
                    implementation_bound: bound,
                    mode,
                }
            }
        }
    }
}

/// Rounding radius of a result and its implementation range once rounded.
fn rounding(
    exact: &LinearEquation,
    hint: Interval,
    scalar: f64,
    session: &Session,
    model: RoundingModel,
) -> (f64, Interval) {
    let range = exact.bounds().intersect(&hint);
    if model == RoundingModel::Exact || (exact.is_constant() && exact.constant_term() == scalar) {
        return (0.0, range);
    }
    let radius = model.radius(session.format(), range.magnitude());
    (
        radius,
        Interval::new(sub_down(range.lo, radius), add_up(range.hi, radius)),
    )
}

fn with_rounding(equation: LinearEquation, radius: f64, symbols: &mut SymbolTable) -> LinearEquation {
    if radius == 0.0 {
        equation
    } else if radius.is_finite() {
        equation.add_term(symbols.fresh(SymbolKind::Rounding), radius)
    } else {
        equation.widen(f64::INFINITY)
    }
}

/// Value reaching every real in each tracked domain, for results across a pole.
pub(crate) fn unbounded(scalar: f64, session: &mut Session) -> Zonotope {
    let scalar = if scalar.is_nan() { Interval::ENTIRE.midpoint() } else { scalar };
    let entire = Interval::ENTIRE;
    hull_draft(session.mode(), entire, entire, entire, scalar, session.symbols_mut())
        .finish(session, RoundingModel::Exact)
}

pub(crate) fn infeasible(session: &Session, code: &str, message: &str, operation: &str) -> ZonalError {
    let mut info = ErrorInfo::new(code, message).with_context("operation", operation);
    if let Some(site) = session.symbols().site() {
        info = info.at(site);
    }
    ZonalError::Infeasible(info)
}

impl Zonotope {
    pub(crate) fn halves(&self, mode: DomainMode, operation: &str) -> Result<Halves, ZonalError> {
        match mode {
            DomainMode::RealAndImplementation => {
                let (real, real_bound) = self.require_real(operation)?;
                let error = self.require_error(operation)?;
                Ok(Halves {
                    real: real.clone(),
                    real_bound,
                    error: error.clone(),
                    implementation_bound: self.implementation_bound,
                    scalar: self.implementation,
                })
            }
            DomainMode::OnlyReal => {
                let (real, real_bound) = self.require_real(operation)?;
                Ok(Halves {
                    real: real.clone(),
                    real_bound,
                    error: LinearEquation::zero(),
                    implementation_bound: Interval::ENTIRE,
                    scalar: self.implementation,
                })
            }
            DomainMode::OnlyImplementation => {
                let (form, bound) = self.require_implementation(operation)?;
                Ok(Halves {
                    real: form,
                    real_bound: bound,
                    error: LinearEquation::zero(),
                    implementation_bound: bound,
                    scalar: self.implementation,
                })
            }
        }
    }

    /// `self + other`.
    pub fn add(&self, other: &Zonotope, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.add_rounded(other, session, RoundingModel::Arithmetic)
    }

    pub(crate) fn add_rounded(
        &self,
        other: &Zonotope,
        session: &mut Session,
        model: RoundingModel,
    ) -> Result<Zonotope, ZonalError> {
        let mode = session.mode();
        let a = self.halves(mode, "add")?;
        let b = other.halves(mode, "add")?;
        Ok(Draft {
            real: a.real.add(&b.real),
            real_hint: a.real_bound.add(&b.real_bound),
            error: a.error.add(&b.error),
            implementation_hint: a.implementation_bound.add(&b.implementation_bound),
            scalar: a.scalar + b.scalar,
        }
        .finish(session, model))
    }

    /// `self - other`.
    pub fn sub(&self, other: &Zonotope, session: &mut Session) -> Result<Zonotope, ZonalError> {
        let mode = session.mode();
        let a = self.halves(mode, "sub")?;
        let b = other.halves(mode, "sub")?;
        Ok(Draft {
            real: a.real.sub(&b.real),
            real_hint: a.real_bound.sub(&b.real_bound),
            error: a.error.sub(&b.error),
            implementation_hint: a.implementation_bound.sub(&b.implementation_bound),
            scalar: a.scalar - b.scalar,
        }
        .finish(session, RoundingModel::Arithmetic))
    }

    /// `-self`; exact in every format.
    pub fn neg(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        let mode = session.mode();
        let a = self.halves(mode, "neg")?;
        Ok(Draft {
            real: a.real.negate(),
            real_hint: a.real_bound.neg(),
            error: a.error.negate(),
            implementation_hint: a.implementation_bound.neg(),
            scalar: -a.scalar,
        }
        .finish(session, RoundingModel::Exact))
    }

    /// `factor · self` for a program constant `factor`.
    pub fn scale(&self, factor: f64, session: &mut Session) -> Result<Zonotope, ZonalError> {
        let mode = session.mode();
        let a = self.halves(mode, "scale")?;
        let k = Interval::point(factor);
        Ok(Draft {
            real: a.real.scale(factor),
            real_hint: a.real_bound.mul(&k),
            error: a.error.scale(factor),
            implementation_hint: a.implementation_bound.mul(&k),
            scalar: a.scalar * factor,
        }
        .finish(session, RoundingModel::Arithmetic))
    }

    /// `self + value` for a program constant `value`.
    pub fn add_constant(&self, value: f64, session: &mut Session) -> Result<Zonotope, ZonalError> {
        let mode = session.mode();
        let a = self.halves(mode, "add_constant")?;
        let k = Interval::point(value);
        Ok(Draft {
            real: a.real.add_constant(value),
            real_hint: a.real_bound.add(&k),
            error: a.error,
            implementation_hint: a.implementation_bound.add(&k),
            scalar: a.scalar + value,
        }
        .finish(session, RoundingModel::Arithmetic))
    }

    /// `self · other`.
    pub fn mul(&self, other: &Zonotope, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.mul_rounded(other, session, RoundingModel::Arithmetic)
    }

    pub(crate) fn mul_rounded(
        &self,
        other: &Zonotope,
        session: &mut Session,
        model: RoundingModel,
    ) -> Result<Zonotope, ZonalError> {
        let mode = session.mode();
        let a = self.halves(mode, "mul")?;
        let b = other.halves(mode, "mul")?;
        let symbols = session.symbols_mut();
        let real = a.real.mul(&b.real, symbols);
        let real_hint = a.real_bound.mul(&b.real_bound);
        let (error, implementation_hint) = if mode == DomainMode::RealAndImplementation {
            let implementation = b.implementation(mode);
            let error = a
                .error
                .mul(&implementation, symbols)
                .add(&a.real.mul(&b.error, symbols));
            (error, a.implementation_bound.mul(&b.implementation_bound))
        } else {
            (LinearEquation::zero(), real_hint)
        };
        Ok(Draft {
            real,
            real_hint,
            error,
            implementation_hint,
            scalar: a.scalar * b.scalar,
        }
        .finish(session, model))
    }

    /// `self / other`.
    ///
    /// A divisor that is zero in a tracked domain makes the branch infeasible;
    /// a divisor range merely holding zero gives an unbounded quotient.
    pub fn div(&self, other: &Zonotope, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.div_rounded(other, session, RoundingModel::Arithmetic)
    }

    pub(crate) fn div_rounded(
        &self,
        other: &Zonotope,
        session: &mut Session,
        model: RoundingModel,
    ) -> Result<Zonotope, ZonalError> {
        let mode = session.mode();
        let a = self.halves(mode, "div")?;
        let b = other.halves(mode, "div")?;
        let both = mode == DomainMode::RealAndImplementation;
        let divisors = [Some(b.real_bound), both.then_some(b.implementation_bound)];
        if divisors.iter().flatten().any(|range| *range == Interval::point(0.0)) {
            return Err(infeasible(session, "division-by-zero", "divisor is zero", "div"));
        }
        if divisors.iter().flatten().any(|range| Elementary::Recip.has_pole(range)) {
            warn!(divisor = %b.real_bound, "divisor range holds zero, quotient is unbounded");
            return Ok(unbounded(a.scalar / b.scalar, session));
        }
        let symbols = session.symbols_mut();
        let reciprocal = linearize(Elementary::Recip, &b.real, b.real_bound, symbols);
        let quotient = a.real.mul(&reciprocal, symbols);
        let real_hint = a.real_bound.mul(&Elementary::Recip.enclose(&b.real_bound));
        let (error, implementation_hint) = if both {
            let divisor = b.implementation(mode);
            let reciprocal = linearize(Elementary::Recip, &divisor, b.implementation_bound, symbols);
            let numerator = a.error.sub(&quotient.mul(&b.error, symbols));
            (
                numerator.mul(&reciprocal, symbols),
                a.implementation_bound
                    .mul(&Elementary::Recip.enclose(&b.implementation_bound)),
            )
        } else {
            (LinearEquation::zero(), real_hint)
        };
        Ok(Draft {
            real: quotient,
            real_hint,
            error,
            implementation_hint,
            scalar: a.scalar / b.scalar,
        }
        .finish(session, model))
    }
}

#[cfg(test)]
mod tests {
    use zonal_core::{FloatFormat, Settings};

    use super::*;

    fn session() -> Session {
        Session::new(Settings::default()).unwrap()
    }

    #[test]
    fn exact_constant_sum_has_no_rounding_symbol() {
        let mut s = session();
        let a = Zonotope::constant(1.0, &s);
        let b = Zonotope::constant(2.0, &s);
        let c = a.add(&b, &mut s).unwrap();
        assert_eq!(c.implementation(), 3.0);
        assert!(s.symbols().is_empty());
        assert_eq!(c.error_range(), Some(Interval::point(0.0)));
    }

    #[test]
    fn inexact_sum_charges_half_an_ulp() {
        let mut s = session();
        let a = Zonotope::constant(0.1, &s);
        let b = Zonotope::constant(0.2, &s);
        let c = a.add(&b, &mut s).unwrap();
        assert_eq!(c.implementation(), 0.1 + 0.2);
        assert_eq!(s.symbols().len(), 1);
        let error = c.error_range().unwrap();
        assert!(error.magnitude() <= FloatFormat::Double.half_ulp(0.31) * 2.0);
    }

    #[test]
    fn single_format_rounds_the_scalar() {
        let mut s = Session::new(Settings::default().float_format(FloatFormat::Single)).unwrap();
        let a = Zonotope::constant(0.1, &s);
        assert_eq!(a.implementation(), 0.1f32 as f64);
        let error = a.error_range().unwrap();
        assert!(error.contains(0.1f32 as f64 - 0.1));
    }

    #[test]
    fn division_by_zero_is_infeasible() {
        let mut s = session();
        let a = Zonotope::constant(1.0, &s);
        let b = Zonotope::constant(0.0, &s);
        let err = a.div(&b, &mut s).unwrap_err();
        assert_eq!(err.info().code, "division-by-zero");
        assert!(err.is_branch_local());
    }

    #[test]
    fn division_by_a_range_holding_zero_is_unbounded() {
        let mut s = session();
        let a = Zonotope::constant(1.0, &s);
        let b = Zonotope::from_range(-1.0, 1.0, &mut s).unwrap();
        let q = a.div(&b, &mut s).unwrap();
        assert_eq!(q.real_range(), Some(Interval::ENTIRE));
        assert_eq!(q.implementation_range(), Some(Interval::ENTIRE));
        assert!(q.implementation().is_infinite());
    }
}
