//! Rounding to integral values and narrowing integer conversions.

use zonal_core::rounding::{add_down, add_up, next_down, next_up};
use zonal_core::{infeasible_error, invariant_error, DomainMode, Interval, SourceLocation, ZonalError};
use zonal_flow::{BranchRequest, BranchResolution, Session};

use crate::atomic::hull_draft;
use crate::zonotope::{RoundingModel, Zonotope};

/// Rounding applied by a narrowing conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundingMode {
    /// To nearest, ties to even.
    Nearest,
    /// Toward negative infinity.
    Lowest,
    /// Toward positive infinity.
    Highest,
    /// Toward zero.
    Zero,
}

fn round_ties_even(x: f64) -> f64 {
    let rounded = x.round();
    if (rounded - x).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        rounded
    }
}

impl RoundingMode {
    /// Integral value `x` rounds to.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            RoundingMode::Nearest => round_ties_even(x),
            RoundingMode::Lowest => x.floor(),
            RoundingMode::Highest => x.ceil(),
            RoundingMode::Zero => x.trunc(),
        }
    }

    /// Closed enclosure of the reals rounding to `k`.
    fn preimage(self, k: i128) -> Interval {
        let approx = k as f64;
        let (below, above) = if approx as i128 == k {
            (approx, approx)
        } else {
            (next_down(approx), next_up(approx))
        };
        let (lo_shift, hi_shift) = match self {
            RoundingMode::Nearest => (-0.5, 0.5),
            RoundingMode::Lowest => (0.0, 1.0),
            RoundingMode::Highest => (-1.0, 0.0),
            RoundingMode::Zero if k > 0 => (0.0, 1.0),
            RoundingMode::Zero if k < 0 => (-1.0, 0.0),
            RoundingMode::Zero => (-1.0, 1.0),
        };
        Interval::new(add_down(below, lo_shift), add_up(above, hi_shift))
    }
}

#[derive(Debug, Clone, Copy)]
enum Integral {
    Floor,
    Ceil,
    Trunc,
    Round,
}

impl Integral {
    fn name(self) -> &'static str {
        match self {
            Integral::Floor => "floor",
            Integral::Ceil => "ceil",
            Integral::Trunc => "trunc",
            Integral::Round => "round",
        }
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Integral::Floor => x.floor(),
            Integral::Ceil => x.ceil(),
            Integral::Trunc => x.trunc(),
            Integral::Round => x.round(),
        }
    }

    fn over(self, range: &Interval) -> Interval {
        Interval::new(self.apply(range.lo), self.apply(range.hi))
    }
}

/// Integer target of a narrowing conversion.
#[derive(Debug, Clone, Copy)]
struct Target {
    name: &'static str,
    min: i128,
    max: i128,
}

impl Target {
    fn outcome(&self, rounding: RoundingMode, x: f64) -> i128 {
        let rounded = rounding.apply(x);
        if rounded.is_nan() {
            0
        } else if rounded <= self.min as f64 {
            self.min
        } else if rounded >= self.max as f64 {
            self.max
        } else {
            rounded as i128
        }
    }

    fn outcomes(&self, rounding: RoundingMode, range: &Interval) -> (i128, i128) {
        (self.outcome(rounding, range.lo), self.outcome(rounding, range.hi))
    }

    fn preimage(&self, rounding: RoundingMode, k: i128) -> Interval {
        let mut range = rounding.preimage(k);
        if k <= self.min {
            range.lo = f64::NEG_INFINITY;
        }
        if k >= self.max {
            range.hi = f64::INFINITY;
        }
        range
    }
}

const I32: Target = Target {
    name: "to_i32",
    min: i32::MIN as i128,
    max: i32::MAX as i128,
};
const U32: Target = Target {
    name: "to_u32",
    min: 0,
    max: u32::MAX as i128,
};
const I64: Target = Target {
    name: "to_i64",
    min: i64::MIN as i128,
    max: i64::MAX as i128,
};
const U64: Target = Target {
    name: "to_u64",
    min: 0,
    max: u64::MAX as i128,
};

fn contains(range: Option<(i128, i128)>, value: i128) -> bool {
    matches!(range, Some((lo, hi)) if lo <= value && value <= hi)
}

impl Zonotope {
    fn integral(&self, op: Integral, session: &mut Session) -> Result<Zonotope, ZonalError> {
        let mode = session.mode();
        let x = self.halves(mode, op.name())?;
        let real = op.over(&x.real_bound);
        let implementation = op.over(&x.implementation_bound);
        let error = implementation.sub(&real);
        Ok(hull_draft(mode, real, error, implementation, op.apply(x.scalar), session.symbols_mut())
            .finish(session, RoundingModel::Exact))
    }

    /// Largest integral value not above the value.
    pub fn floor(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.integral(Integral::Floor, session)
    }

    /// Smallest integral value not below the value.
    pub fn ceil(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.integral(Integral::Ceil, session)
    }

    /// Integral part.
    pub fn trunc(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.integral(Integral::Trunc, session)
    }

    /// Nearest integral value, ties away from zero.
    pub fn round(&self, session: &mut Session) -> Result<Zonotope, ZonalError> {
        self.integral(Integral::Round, session)
    }

    fn convert(
        &mut self,
        target: Target,
        rounding: RoundingMode,
        session: &mut Session,
        location: &SourceLocation,
    ) -> Result<i128, ZonalError> {
        let mode = session.mode();
        let x = self.halves(mode, target.name)?;
        let first = target.outcomes(rounding, &x.real_bound);
        let (real, implementation) = match mode {
            DomainMode::RealAndImplementation => (
                Some(first),
                Some(target.outcomes(rounding, &x.implementation_bound)),
            ),
            DomainMode::OnlyReal => (Some(first), None),
            DomainMode::OnlyImplementation => (None, Some(first)),
        };
        let request = BranchRequest {
            real,
            implementation,
            concrete: Some(target.outcome(rounding, x.scalar)),
            representative: Some(target.outcome(rounding, x.real.constant_term())),
            error_magnitude: x.error.magnitude(),
        };
        let resolution = session.resolve(location, &request)?;
        self.refine(&request, &resolution, target, rounding, mode, location)?;
        Ok(resolution.value)
    }

    /// Narrows each domain to the reals converting to its resolved outcome.
    ///
    /// A domain is narrowed only when the resolved outcome is one it can take.
    fn refine(
        &mut self,
        request: &BranchRequest,
        resolution: &BranchResolution,
        target: Target,
        rounding: RoundingMode,
        mode: DomainMode,
        location: &SourceLocation,
    ) -> Result<(), ZonalError> {
        let mut refined = self.restrict(mode)?;
        if let Some(k) = resolution.real.filter(|k| contains(request.real, *k)) {
            refined.real_bound = refined.real_bound.intersect(&target.preimage(rounding, k));
        }
        if let Some(k) = resolution.implementation.filter(|k| contains(request.implementation, *k)) {
            let preimage = target.preimage(rounding, k);
            refined.implementation_bound = refined.implementation_bound.intersect(&preimage);
            if mode == DomainMode::OnlyImplementation {
                refined.real_bound = refined.implementation_bound;
            }
            if !refined.implementation_bound.contains(refined.implementation)
                && !refined.implementation_bound.is_empty()
            {
                // Divergent pass: the concrete scalar took another outcome.
                refined.implementation = refined.implementation_bound.midpoint();
            }
        }
        if !refined.optimize_value() {
            return Err(infeasible_error(
                "empty-preimage",
                "no value of the domain converts to the resolved integer",
                location,
            ));
        }
        *self = refined;
        Ok(())
    }

    /// Converts to `i32`, refining the value to the preimage of the result.
    pub fn to_i32(
        &mut self,
        rounding: RoundingMode,
        session: &mut Session,
        location: &SourceLocation,
    ) -> Result<i32, ZonalError> {
        let value = self.convert(I32, rounding, session, location)?;
        i32::try_from(value).map_err(|_| out_of_range(I32, value))
    }

    /// Converts to `u32`, refining the value to the preimage of the result.
    pub fn to_u32(
        &mut self,
        rounding: RoundingMode,
        session: &mut Session,
        location: &SourceLocation,
    ) -> Result<u32, ZonalError> {
        let value = self.convert(U32, rounding, session, location)?;
        u32::try_from(value).map_err(|_| out_of_range(U32, value))
    }

    /// Converts to `i64`, refining the value to the preimage of the result.
    pub fn to_i64(
        &mut self,
        rounding: RoundingMode,
        session: &mut Session,
        location: &SourceLocation,
    ) -> Result<i64, ZonalError> {
        let value = self.convert(I64, rounding, session, location)?;
        i64::try_from(value).map_err(|_| out_of_range(I64, value))
    }

    /// Converts to `u64`, refining the value to the preimage of the result.
    pub fn to_u64(
        &mut self,
        rounding: RoundingMode,
        session: &mut Session,
        location: &SourceLocation,
    ) -> Result<u64, ZonalError> {
        let value = self.convert(U64, rounding, session, location)?;
        u64::try_from(value).map_err(|_| out_of_range(U64, value))
    }
}

fn out_of_range(target: Target, value: i128) -> ZonalError {
    invariant_error("conversion-range", "resolved outcome does not fit the target", target.name)
        .with_context("value", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_go_to_even() {
        assert_eq!(RoundingMode::Nearest.apply(2.5), 2.0);
        assert_eq!(RoundingMode::Nearest.apply(3.5), 4.0);
        assert_eq!(RoundingMode::Nearest.apply(-2.5), -2.0);
        assert_eq!(RoundingMode::Nearest.apply(2.4), 2.0);
    }

    #[test]
    fn saturated_outcomes_have_unbounded_preimages() {
        assert_eq!(U32.outcome(RoundingMode::Zero, -3.5), 0);
        assert_eq!(I32.outcome(RoundingMode::Zero, 1e12), i32::MAX as i128);
        let preimage = U32.preimage(RoundingMode::Zero, 0);
        assert_eq!(preimage.lo, f64::NEG_INFINITY);
        assert_eq!(preimage.hi, 1.0);
    }
}
