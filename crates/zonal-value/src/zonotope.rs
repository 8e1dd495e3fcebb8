use zonal_affine::{LinearEquation, SymbolKind};
use zonal_core::rounding::mul_up;
use zonal_core::{invariant_error, DomainMode, FloatFormat, Interval, ZonalError, LIBM_ULPS};
use zonal_flow::Session;

/// Rounding charged to the implementation result of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoundingModel {
    /// Intermediate step of a composed libm call.
    Exact,
    /// Correctly rounded operation (`+ - * / sqrt`).
    Arithmetic,
    /// Libm function with the configured accuracy.
    Libm,
    /// Explicit number of half-ulps.
    HalfUlps(u32),
}

impl RoundingModel {
    fn half_ulps(self) -> u32 {
        match self {
            RoundingModel::Exact => 0,
            RoundingModel::Arithmetic => 1,
            RoundingModel::Libm => 1 + 2 * LIBM_ULPS,
            RoundingModel::HalfUlps(n) => n,
        }
    }

    pub(crate) fn radius(self, format: FloatFormat, magnitude: f64) -> f64 {
        match self.half_ulps() {
            0 => 0.0,
            n => mul_up(format.half_ulp(magnitude), f64::from(n)),
        }
    }

    pub(crate) fn round(self, format: FloatFormat, value: f64) -> f64 {
        match self {
            RoundingModel::Exact => value,
            _ => format.round(value),
        }
    }
}

/// Value tracked simultaneously in the real and implementation domains.
///
/// `real` is the affine form of the idealized real computation and `error`
/// the affine form of the implementation minus the real value, so the
/// implementation form is `real + error`. When only the implementation is
/// tracked, `real` carries the implementation form and `error` is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Zonotope {
    pub(crate) real: LinearEquation,
    pub(crate) error: LinearEquation,
    pub(crate) implementation: f64,
    pub(crate) real_bound: Interval,
    pub(crate) implementation_bound: Interval,
    pub(crate) mode: DomainMode,
}

impl Zonotope {
    /// Program constant; the implementation holds it rounded to the session format.
    pub fn constant(value: f64, session: &Session) -> Self {
        let rounded = session.format().round(value);
        match session.mode() {
            DomainMode::OnlyImplementation => Self::shadow(LinearEquation::constant(rounded), rounded),
            mode => {
                let error = LinearEquation::zero().add_constant(rounded).add_constant(-value);
                let mut zonotope = Self {
                    real: LinearEquation::constant(value),
                    error,
                    implementation: rounded,
                    real_bound: Interval::point(value),
                    implementation_bound: Interval::point(rounded),
                    mode,
                };
                if mode == DomainMode::OnlyReal {
                    zonotope.error = LinearEquation::zero();
                }
                zonotope
            }
        }
    }

    /// Input ranging over `[min, max]` identically in both domains.
    pub fn from_range(min: f64, max: f64, session: &mut Session) -> Result<Self, ZonalError> {
        Self::from_range_with_error(min, max, 0.0, 0.0, session)
    }

    /// Input ranging over `[min, max]` whose implementation deviates by `[errmin, errmax]`.
    pub fn from_range_with_error(
        min: f64,
        max: f64,
        errmin: f64,
        errmax: f64,
        session: &mut Session,
    ) -> Result<Self, ZonalError> {
        check_range("from-range", min, max)?;
        check_range("from-range-error", errmin, errmax)?;
        let range = Interval::new(min, max);
        let deviation = Interval::new(errmin, errmax);
        let real = LinearEquation::interval_form(range, SymbolKind::Input, session.symbols_mut());
        let error = LinearEquation::interval_form(deviation, SymbolKind::Input, session.symbols_mut());
        let implementation_bound = range.add(&deviation);
        let format = session.format();
        let scalar = format
            .round(range.midpoint() + deviation.midpoint())
            .clamp(implementation_bound.lo, implementation_bound.hi);
        let mode = session.mode();
        Ok(match mode {
            DomainMode::OnlyImplementation => {
                let mut shadow = Self::shadow(real.add(&error), scalar);
                shadow.implementation_bound = implementation_bound;
                shadow.real_bound = implementation_bound;
                shadow
            }
            DomainMode::OnlyReal => Self {
                real,
                error: LinearEquation::zero(),
                implementation: scalar,
                real_bound: range,
                implementation_bound: Interval::ENTIRE,
                mode,
            },
            DomainMode::RealAndImplementation => Self {
                real,
                error,
                implementation: scalar,
                real_bound: range,
                implementation_bound,
                mode,
            },
        })
    }

    pub(crate) fn shadow(form: LinearEquation, scalar: f64) -> Self {
        let bound = form.bounds();
        Self {
            real: form,
            error: LinearEquation::zero(),
            implementation: scalar,
            real_bound: bound,
            implementation_bound: bound,
            mode: DomainMode::OnlyImplementation,
        }
    }

    /// Domains this value tracks.
    pub fn mode(&self) -> DomainMode {
        self.mode
    }

    /// Concrete implementation scalar.
    pub fn implementation(&self) -> f64 {
        self.implementation
    }

    /// Range of the real value, when tracked.
    pub fn real_range(&self) -> Option<Interval> {
        self.mode.tracks_real().then_some(self.real_bound)
    }

    /// Range of the implementation value, when tracked.
    pub fn implementation_range(&self) -> Option<Interval> {
        self.mode
            .tracks_implementation()
            .then_some(self.implementation_bound)
    }

    /// Range of `implementation - real`, when both are tracked.
    pub fn error_range(&self) -> Option<Interval> {
        (self.mode == DomainMode::RealAndImplementation).then(|| self.error.bounds())
    }

    /// Affine form of the real value, when tracked.
    pub fn real_form(&self) -> Option<&LinearEquation> {
        self.mode.tracks_real().then_some(&self.real)
    }

    /// Affine form of `implementation - real`, when both are tracked.
    pub fn error_form(&self) -> Option<&LinearEquation> {
        (self.mode == DomainMode::RealAndImplementation).then_some(&self.error)
    }

    /// Affine form of the implementation value, when tracked.
    pub fn implementation_form(&self) -> Option<LinearEquation> {
        match self.mode {
            DomainMode::RealAndImplementation => Some(self.real.add(&self.error)),
            DomainMode::OnlyImplementation => Some(self.real.clone()),
            DomainMode::OnlyReal => None,
        }
    }

    /// Smallest interval holding both the real and implementation values.
    pub fn min_max(&self) -> Interval {
        match self.mode {
            DomainMode::RealAndImplementation => self.real_bound.hull(&self.implementation_bound),
            DomainMode::OnlyReal => self.real_bound,
            DomainMode::OnlyImplementation => self.implementation_bound,
        }
    }

    pub(crate) fn require_real(&self, operation: &str) -> Result<(&LinearEquation, Interval), ZonalError> {
        if self.mode.tracks_real() {
            Ok((&self.real, self.real_bound))
        } else {
            Err(operand_error(operation, "real", self.mode))
        }
    }

    pub(crate) fn require_error(&self, operation: &str) -> Result<&LinearEquation, ZonalError> {
        if self.mode == DomainMode::RealAndImplementation {
            Ok(&self.error)
        } else {
            Err(operand_error(operation, "error", self.mode))
        }
    }

    pub(crate) fn require_implementation(
        &self,
        operation: &str,
    ) -> Result<(LinearEquation, Interval), ZonalError> {
        match self.implementation_form() {
            Some(form) => Ok((form, self.implementation_bound)),
            None => Err(operand_error(operation, "implementation", self.mode)),
        }
    }

    /// Intersects the stored bounds with the forms and across domains.
    ///
    /// Returns `false` when a tracked domain becomes empty or the concrete
    /// scalar leaves the implementation bound. A second application leaves a
    /// consistent value unchanged.
    pub fn optimize_value(&mut self) -> bool {
        match self.mode {
            DomainMode::RealAndImplementation => {
                self.real_bound = self.real_bound.intersect(&self.real.bounds());
                let implementation = self.real.add(&self.error).bounds();
                self.implementation_bound = self.implementation_bound.intersect(&implementation);
                if self.real_bound.is_empty() || self.implementation_bound.is_empty() {
                    return false;
                }
                let error = self.error.bounds();
                self.implementation_bound = self
                    .implementation_bound
                    .intersect(&self.real_bound.add(&error));
                if self.implementation_bound.is_empty() {
                    return false;
                }
                self.real_bound = self
                    .real_bound
                    .intersect(&self.implementation_bound.sub(&error));
                !self.real_bound.is_empty() && self.implementation_bound.contains(self.implementation)
            }
            DomainMode::OnlyReal => {
                self.real_bound = self.real_bound.intersect(&self.real.bounds());
                !self.real_bound.is_empty()
            }
            DomainMode::OnlyImplementation => {
                self.implementation_bound = self.implementation_bound.intersect(&self.real.bounds());
                self.real_bound = self.implementation_bound;
                !self.implementation_bound.is_empty()
                    && self.implementation_bound.contains(self.implementation)
            }
        }
    }

    /// Applies the session's symbol limit to every form.
    pub fn simplify(&mut self, session: &mut Session) {
        self.real = session.simplify(std::mem::take(&mut self.real));
        self.error = session.simplify(std::mem::take(&mut self.error));
    }

    /// Re-expresses the value in `mode`, which must be covered by the value's own mode.
    pub fn restrict(&self, mode: DomainMode) -> Result<Self, ZonalError> {
        if self.mode == mode {
            return Ok(self.clone());
        }
        if !self.mode.covers(mode) {
            return Err(operand_error("restrict", "requested", self.mode));
        }
        Ok(match mode {
            DomainMode::OnlyReal => Self {
                error: LinearEquation::zero(),
                implementation_bound: Interval::ENTIRE,
                mode,
                ..self.clone()
            },
            DomainMode::OnlyImplementation => {
                let mut shadow = Self::shadow(self.real.add(&self.error), self.implementation);
                shadow.implementation_bound = self.implementation_bound;
                shadow.real_bound = self.implementation_bound;
                shadow
            }
            DomainMode::RealAndImplementation => self.clone(),
        })
    }
}

fn check_range(code: &str, min: f64, max: f64) -> Result<(), ZonalError> {
    if min.is_nan() || max.is_nan() || min > max {
        return Err(invariant_error(code, "range bounds are not ordered", "from_range")
            .with_context("min", min)
            .with_context("max", max));
    }
    Ok(())
}

pub(crate) fn operand_error(operation: &str, domain: &str, mode: DomainMode) -> ZonalError {
    invariant_error("operand-mode", format!("operand does not track the {domain} domain"), operation)
        .with_context("mode", format!("{mode:?}"))
}
