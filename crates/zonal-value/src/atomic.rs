//! `abs`, `min` and `max`, as value operations or through a branch.

use zonal_affine::{LinearEquation, SymbolKind, SymbolTable};
use zonal_core::{DomainMode, Interval, SourceLocation, ZonalError};
use zonal_flow::{Session, Tristate};

use crate::arith::Draft;
use crate::zonotope::{RoundingModel, Zonotope};

/// Result covered by independent hull symbols in each tracked half.
pub(crate) fn hull_draft(
    mode: DomainMode,
    real: Interval,
    error: Interval,
    implementation: Interval,
    scalar: f64,
    symbols: &mut SymbolTable,
) -> Draft {
    match mode {
        DomainMode::RealAndImplementation => Draft {
            real: LinearEquation::interval_form(real, SymbolKind::Hull, symbols),
            real_hint: real,
            error: LinearEquation::interval_form(error, SymbolKind::Hull, symbols),
            implementation_hint: implementation,
            scalar,
        },
        DomainMode::OnlyReal => Draft {
            real: LinearEquation::interval_form(real, SymbolKind::Hull, symbols),
            real_hint: real,
            error: LinearEquation::zero(),
            implementation_hint: Interval::ENTIRE,
            scalar,
        },
        DomainMode::OnlyImplementation => Draft {
            real: LinearEquation::interval_form(implementation, SymbolKind::Hull, symbols),
            real_hint: implementation,
            error: LinearEquation::zero(),
            implementation_hint: implementation,
            scalar,
        },
    }
}

fn absolute(range: &Interval) -> Interval {
    Interval::new(range.mignitude(), range.magnitude())
}

fn symmetric(radius: f64) -> Interval {
    Interval::new(-radius, radius)
}

impl Zonotope {
    /// Copy of the value expressed in the session mode.
    pub(crate) fn reshaped(&self, session: &mut Session, operation: &str) -> Result<Zonotope, ZonalError> {
        let x = self.halves(session.mode(), operation)?;
        Ok(Draft {
            real: x.real,
            real_hint: x.real_bound,
            error: x.error,
            implementation_hint: x.implementation_bound,
            scalar: x.scalar,
        }
        .finish(session, RoundingModel::Exact))
    }

    /// Absolute value.
    ///
    /// Without atomic support the sign is settled by a decision at `location`.
    pub fn abs(&self, session: &mut Session, location: &SourceLocation) -> Result<Zonotope, ZonalError> {
        if !session.settings().support_atomic {
            let zero = Zonotope::constant(0.0, session);
            let negative = self.lt(&zero, session)?;
            return if session.branch(&negative, location)? {
                self.neg(session)
            } else {
                self.reshaped(session, "abs")
            };
        }
        let zero = Zonotope::constant(0.0, session);
        match self.ge(&zero, session)?.verdict() {
            Tristate::True => return self.reshaped(session, "abs"),
            Tristate::False => return self.neg(session),
            Tristate::Top => {}
        }
        let mode = session.mode();
        let x = self.halves(mode, "abs")?;
        let real = absolute(&x.real_bound);
        let implementation = absolute(&x.implementation_bound);
        let error = symmetric(x.error.magnitude()).intersect(&implementation.sub(&real));
        Ok(hull_draft(mode, real, error, implementation, x.scalar.abs(), session.symbols_mut())
            .finish(session, RoundingModel::Exact))
    }

    /// Smaller of both values.
    pub fn min(&self, other: &Zonotope, session: &mut Session, location: &SourceLocation) -> Result<Zonotope, ZonalError> {
        self.extremum(other, session, location, false)
    }

    /// Larger of both values.
    pub fn max(&self, other: &Zonotope, session: &mut Session, location: &SourceLocation) -> Result<Zonotope, ZonalError> {
        self.extremum(other, session, location, true)
    }

    fn extremum(
        &self,
        other: &Zonotope,
        session: &mut Session,
        location: &SourceLocation,
        largest: bool,
    ) -> Result<Zonotope, ZonalError> {
        let operation = if largest { "max" } else { "min" };
        // `self` wins when `self <= other` for min and `self >= other` for max.
        let self_wins = if largest {
            self.ge(other, session)?
        } else {
            self.le(other, session)?
        };
        if !session.settings().support_atomic {
            return if session.branch(&self_wins, location)? {
                self.reshaped(session, operation)
            } else {
                other.reshaped(session, operation)
            };
        }
        match self_wins.verdict() {
            Tristate::True => return self.reshaped(session, operation),
            Tristate::False => return other.reshaped(session, operation),
            Tristate::Top => {}
        }
        let mode = session.mode();
        let a = self.halves(mode, operation)?;
        let b = other.halves(mode, operation)?;
        let pick = |x: &Interval, y: &Interval| {
            if largest {
                Interval::new(x.lo.max(y.lo), x.hi.max(y.hi))
            } else {
                Interval::new(x.lo.min(y.lo), x.hi.min(y.hi))
            }
        };
        let real = pick(&a.real_bound, &b.real_bound);
        let implementation = pick(&a.implementation_bound, &b.implementation_bound);
        let error = symmetric(a.error.magnitude().max(b.error.magnitude()))
            .intersect(&implementation.sub(&real));
        let scalar = if largest {
            a.scalar.max(b.scalar)
        } else {
            a.scalar.min(b.scalar)
        };
        Ok(hull_draft(mode, real, error, implementation, scalar, session.symbols_mut())
            .finish(session, RoundingModel::Exact))
    }
}

#[cfg(test)]
mod tests {
    use zonal_core::{here, Settings};

    use super::*;

    #[test]
    fn abs_of_straddling_range_is_a_hull() {
        let mut session = Session::new(Settings::default()).unwrap();
        let x = Zonotope::from_range(-2.0, 1.0, &mut session).unwrap();
        let y = x.abs(&mut session, &here!()).unwrap();
        assert_eq!(y.real_range(), Some(Interval::new(0.0, 2.0)));
        assert_eq!(y.implementation(), 0.5);
        assert_eq!(session.path().stats().split_calls, 0);
    }

    #[test]
    fn decided_min_keeps_the_operand() {
        let mut session = Session::new(Settings::default()).unwrap();
        let a = Zonotope::from_range(0.0, 1.0, &mut session).unwrap();
        let b = Zonotope::from_range(2.0, 3.0, &mut session).unwrap();
        let m = a.min(&b, &mut session, &here!()).unwrap();
        assert_eq!(m.real_form(), a.real_form());
    }

    #[test]
    fn branching_abs_asks_the_controller() {
        let settings = Settings::default().support_atomic(false);
        let mut session = Session::new(settings).unwrap();
        let x = Zonotope::from_range(-2.0, 1.0, &mut session).unwrap();
        let _ = x.abs(&mut session, &here!()).unwrap();
        assert_eq!(session.path().stats().split_calls, 1);
        assert_eq!(session.path().unstable_sites().len(), 1);
    }
}
