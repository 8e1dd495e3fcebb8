use zonal_core::{DomainMode, Interval, ZonalError};
use zonal_flow::{Comparison, Session, Tristate};

use crate::zonotope::Zonotope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Predicate {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl Predicate {
    fn name(self) -> &'static str {
        match self {
            Predicate::Lt => "lt",
            Predicate::Le => "le",
            Predicate::Eq => "eq",
            Predicate::Ne => "ne",
            Predicate::Ge => "ge",
            Predicate::Gt => "gt",
        }
    }

    /// Verdict of `d <op> 0` over every `d` in `difference`.
    fn over(self, difference: &Interval) -> Tristate {
        if difference.is_empty() {
            return Tristate::Top;
        }
        let (lo, hi) = (difference.lo, difference.hi);
        match self {
            Predicate::Lt => decided(hi < 0.0, lo >= 0.0),
            Predicate::Le => decided(hi <= 0.0, lo > 0.0),
            Predicate::Gt => decided(lo > 0.0, hi <= 0.0),
            Predicate::Ge => decided(lo >= 0.0, hi < 0.0),
            Predicate::Eq => decided(lo == 0.0 && hi == 0.0, !difference.contains(0.0)),
            Predicate::Ne => Predicate::Eq.over(difference).not(),
        }
    }

    fn holds(self, a: f64, b: f64) -> bool {
        match self {
            Predicate::Lt => a < b,
            Predicate::Le => a <= b,
            Predicate::Eq => a == b,
            Predicate::Ne => a != b,
            Predicate::Ge => a >= b,
            Predicate::Gt => a > b,
        }
    }
}

fn decided(always: bool, never: bool) -> Tristate {
    if always {
        Tristate::True
    } else if never {
        Tristate::False
    } else {
        Tristate::Top
    }
}

impl Zonotope {
    fn compare(&self, other: &Zonotope, predicate: Predicate, session: &Session) -> Result<Comparison, ZonalError> {
        let mode = session.mode();
        let a = self.halves(mode, predicate.name())?;
        let b = other.halves(mode, predicate.name())?;
        let first = a.real.sub(&b.real);
        let first_range = first.bounds().intersect(&a.real_bound.sub(&b.real_bound));
        let centre = first.constant_term();
        let (real, implementation, error_magnitude) = match mode {
            DomainMode::RealAndImplementation => {
                let error = a.error.sub(&b.error);
                let implementation = first.add(&error).bounds().intersect(
                    &a.implementation_bound.sub(&b.implementation_bound),
                );
                (
                    Some(predicate.over(&first_range)),
                    Some(predicate.over(&implementation)),
                    error.magnitude(),
                )
            }
            DomainMode::OnlyReal => (Some(predicate.over(&first_range)), None, 0.0),
            DomainMode::OnlyImplementation => (None, Some(predicate.over(&first_range)), 0.0),
        };
        Ok(Comparison {
            real,
            implementation,
            concrete: predicate.holds(a.scalar, b.scalar),
            representative: predicate.holds(centre, 0.0),
            error_magnitude,
        })
    }

    /// `self < other` in every tracked domain.
    pub fn lt(&self, other: &Zonotope, session: &Session) -> Result<Comparison, ZonalError> {
        self.compare(other, Predicate::Lt, session)
    }

    /// `self <= other` in every tracked domain.
    pub fn le(&self, other: &Zonotope, session: &Session) -> Result<Comparison, ZonalError> {
        self.compare(other, Predicate::Le, session)
    }

    /// `self == other` in every tracked domain.
    pub fn eq(&self, other: &Zonotope, session: &Session) -> Result<Comparison, ZonalError> {
        self.compare(other, Predicate::Eq, session)
    }

    /// `self != other` in every tracked domain.
    pub fn ne(&self, other: &Zonotope, session: &Session) -> Result<Comparison, ZonalError> {
        self.compare(other, Predicate::Ne, session)
    }

    /// `self >= other` in every tracked domain.
    pub fn ge(&self, other: &Zonotope, session: &Session) -> Result<Comparison, ZonalError> {
        self.compare(other, Predicate::Ge, session)
    }

    /// `self > other` in every tracked domain.
    pub fn gt(&self, other: &Zonotope, session: &Session) -> Result<Comparison, ZonalError> {
        self.compare(other, Predicate::Gt, session)
    }
}

#[cfg(test)]
mod tests {
    use zonal_core::Settings;

    use super::*;

    #[test]
    fn disjoint_ranges_are_decided() {
        let mut session = Session::new(Settings::default()).unwrap();
        let a = Zonotope::from_range(0.0, 1.0, &mut session).unwrap();
        let b = Zonotope::from_range(2.0, 3.0, &mut session).unwrap();
        let cmp = a.lt(&b, &session).unwrap();
        assert_eq!(cmp.verdict(), Tristate::True);
        assert_eq!(a.ge(&b, &session).unwrap().verdict(), Tristate::False);
    }

    #[test]
    fn shared_symbols_decide_self_comparison() {
        let mut session = Session::new(Settings::default()).unwrap();
        let a = Zonotope::from_range(0.0, 1.0, &mut session).unwrap();
        assert_eq!(a.eq(&a, &session).unwrap().verdict(), Tristate::True);
        assert_eq!(a.lt(&a, &session).unwrap().verdict(), Tristate::False);
    }

    #[test]
    fn overlapping_ranges_are_top() {
        let mut session = Session::new(Settings::default()).unwrap();
        let a = Zonotope::from_range(0.0, 2.0, &mut session).unwrap();
        let b = Zonotope::from_range(1.0, 3.0, &mut session).unwrap();
        let cmp = a.lt(&b, &session).unwrap();
        assert_eq!(cmp.real, Some(Tristate::Top));
        assert_eq!(cmp.verdict(), Tristate::Top);
    }
}
