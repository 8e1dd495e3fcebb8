//! Affine forms over noise symbols with sound binary64 coefficients.
//!
//! Coefficients are kept in binary64. Each coefficient operation recovers
//! its exact rounding error through an error-free transformation and adds the
//! magnitude to the equation's slack, an anonymous radius centred on zero.

use std::collections::{BTreeMap, BTreeSet};

use zonal_core::rounding::{abs_sum_up, add_up, mul_up, sub_down, two_prod, two_sum};
use zonal_core::Interval;

use crate::symbol::{SymbolId, SymbolKind, SymbolTable};

/// `constant + Σ coefficient·ε + slack·η`, with every `ε, η ∈ [-1, 1]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearEquation {
    constant: f64,
    terms: BTreeMap<SymbolId, f64>,
    slack: f64,
}

fn absorb(slack: &mut f64, err: f64) {
    if err.is_finite() {
        *slack = add_up(*slack, err.abs());
    } else {
        *slack = f64::INFINITY;
    }
}

impl LinearEquation {
    /// The zero equation.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Equation holding a single constant.
    pub fn constant(value: f64) -> Self {
        Self {
            constant: value,
            terms: BTreeMap::new(),
            slack: 0.0,
        }
    }

    /// `constant + coefficient·symbol`.
    pub fn with_term(constant: f64, symbol: SymbolId, coefficient: f64) -> Self {
        Self::constant(constant).add_term(symbol, coefficient)
    }

    /// Equation covering `range` through one fresh symbol of the given kind.
    ///
    /// Point ranges produce constant equations. Unbounded ranges are covered
    /// by an infinite slack.
    pub fn interval_form(range: Interval, kind: SymbolKind, symbols: &mut SymbolTable) -> Self {
        if range.is_singleton() {
            return Self::constant(range.lo);
        }
        if !range.is_bounded() {
            return Self {
                constant: range.midpoint(),
                terms: BTreeMap::new(),
                slack: f64::INFINITY,
            };
        }
        let centre = range.midpoint();
        let radius = range.radius();
        Self::with_term(centre, symbols.fresh(kind), radius)
    }

    /// Constant term.
    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    /// Anonymous rounding radius.
    pub fn slack(&self) -> f64 {
        self.slack
    }

    /// Coefficient of `symbol` (zero when absent).
    pub fn coefficient(&self, symbol: SymbolId) -> f64 {
        self.terms.get(&symbol).copied().unwrap_or(0.0)
    }

    /// Symbol terms in identifier order.
    pub fn terms(&self) -> impl Iterator<Item = (SymbolId, f64)> + '_ {
        self.terms.iter().map(|(id, coef)| (*id, *coef))
    }

    /// Referenced symbols.
    pub fn symbols(&self) -> BTreeSet<SymbolId> {
        self.terms.keys().copied().collect()
    }

    /// Number of referenced symbols.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the equation references no symbol.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether the equation denotes exactly one value.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty() && self.slack == 0.0
    }

    /// Upper bound on `Σ|coefficient| + slack`.
    pub fn radius(&self) -> f64 {
        add_up(abs_sum_up(self.terms.values().copied()), self.slack)
    }

    /// Outward-rounded range of the equation.
    pub fn bounds(&self) -> Interval {
        let radius = self.radius();
        Interval::new(sub_down(self.constant, radius), add_up(self.constant, radius))
    }

    /// Lower end of [`LinearEquation::bounds`].
    pub fn min_bound(&self) -> f64 {
        self.bounds().lo
    }

    /// Upper end of [`LinearEquation::bounds`].
    pub fn max_bound(&self) -> f64 {
        self.bounds().hi
    }

    /// Largest absolute value the equation can take.
    pub fn magnitude(&self) -> f64 {
        self.bounds().magnitude()
    }

    /// Encloses the values reachable at `point`, slack included.
    ///
    /// Missing symbols evaluate at zero. Values outside `[-1, 1]` are clamped.
    pub fn evaluate_at(&self, point: &BTreeMap<SymbolId, f64>) -> Interval {
        let mut up = 0.0;
        let mut down = 0.0;
        for (id, coef) in &self.terms {
            let eps = point.get(id).copied().unwrap_or(0.0).clamp(-1.0, 1.0);
            up = add_up(up, mul_up(*coef, eps));
            down = add_up(down, mul_up(-*coef, eps));
        }
        Interval::new(
            sub_down(self.constant, add_up(down, self.slack)),
            add_up(self.constant, add_up(up, self.slack)),
        )
    }

    /// Adds `coefficient·symbol`.
    pub fn add_term(mut self, symbol: SymbolId, coefficient: f64) -> Self {
        if coefficient == 0.0 {
            return self;
        }
        let current = self.coefficient(symbol);
        let (sum, err) = two_sum(current, coefficient);
        absorb(&mut self.slack, err);
        if sum == 0.0 {
            self.terms.remove(&symbol);
        } else {
            self.terms.insert(symbol, sum);
        }
        self
    }

    /// Adds a centred radius to the slack.
    pub fn widen(mut self, radius: f64) -> Self {
        absorb(&mut self.slack, radius);
        self
    }

    /// Adds a constant.
    pub fn add_constant(&self, value: f64) -> Self {
        let mut result = self.clone();
        let (sum, err) = two_sum(self.constant, value);
        result.constant = sum;
        absorb(&mut result.slack, err);
        result
    }

    /// Symbol-wise sum; shared symbols add their coefficients.
    pub fn add(&self, other: &LinearEquation) -> Self {
        let mut result = self.add_constant(other.constant);
        for (id, coef) in &other.terms {
            result = result.add_term(*id, *coef);
        }
        absorb(&mut result.slack, other.slack);
        result
    }

    /// Symbol-wise difference.
    pub fn sub(&self, other: &LinearEquation) -> Self {
        self.add(&other.negate())
    }

    /// Exact negation.
    pub fn negate(&self) -> Self {
        Self {
            constant: -self.constant,
            terms: self.terms.iter().map(|(id, c)| (*id, -*c)).collect(),
            slack: self.slack,
        }
    }

    /// Multiplies every coefficient by `factor`.
    pub fn scale(&self, factor: f64) -> Self {
        if factor == 0.0 && self.radius().is_finite() && self.constant.is_finite() {
            return Self::zero();
        }
        let mut slack = mul_up(self.slack, factor.abs());
        let (constant, err) = two_prod(self.constant, factor);
        absorb(&mut slack, err);
        let mut terms = BTreeMap::new();
        for (id, coef) in &self.terms {
            let (product, err) = two_prod(*coef, factor);
            absorb(&mut slack, err);
            if product != 0.0 {
                terms.insert(*id, product);
            }
        }
        Self {
            constant,
            terms,
            slack,
        }
    }

    /// Affine product; the quadratic remainder becomes one fresh symbol.
    pub fn mul(&self, other: &LinearEquation, symbols: &mut SymbolTable) -> Self {
        let centre_self = self.constant;
        let centre_other = other.constant;
        let mut result = self
            .without_constant()
            .scale(centre_other)
            .add(&other.without_constant().scale(centre_self));
        let (product, err) = two_prod(centre_self, centre_other);
        result = result.add_constant(product).widen(err);
        let remainder = mul_up(self.radius(), other.radius());
        if remainder > 0.0 {
            if remainder.is_finite() {
                result = result.add_term(symbols.fresh(SymbolKind::Linearization), remainder);
            } else {
                result = result.widen(f64::INFINITY);
            }
        }
        result
    }

    /// Folds the lowest-influence symbols once more than `limit` remain.
    ///
    /// The `limit - 1` symbols with the largest `|coefficient|` stay. The rest,
    /// lowest influence first and ties broken by identifier, are replaced by one
    /// fresh [`SymbolKind::Simplification`] symbol whose coefficient is the
    /// upward-rounded sum of the folded magnitudes.
    pub fn bounded_simplify(&self, limit: usize, symbols: &mut SymbolTable) -> Self {
        if self.terms.len() <= limit {
            return self.clone();
        }
        let mut ranked: Vec<(SymbolId, f64)> = self.terms().collect();
        ranked.sort_by(|a, b| {
            a.1.abs()
                .total_cmp(&b.1.abs())
                .then_with(|| a.0.cmp(&b.0))
        });
        let fold = self.terms.len() + 1 - limit.max(1);
        let folded = abs_sum_up(ranked[..fold].iter().map(|(_, coef)| *coef));
        let mut result = Self {
            constant: self.constant,
            terms: ranked[fold..].iter().copied().collect(),
            slack: self.slack,
        };
        if folded > 0.0 {
            result
                .terms
                .insert(symbols.fresh(SymbolKind::Simplification), folded);
        }
        result
    }

    /// Pointwise-sound affine union of two equations.
    ///
    /// Shared coefficients of equal sign keep the smaller magnitude, every
    /// other coefficient is dropped. The residual hull of both operands is
    /// covered by one fresh [`SymbolKind::Merge`] symbol.
    pub fn join(&self, other: &LinearEquation, symbols: &mut SymbolTable) -> Self {
        if self == other {
            return self.clone();
        }
        let mut kept = LinearEquation::zero();
        for (id, a) in &self.terms {
            let b = other.coefficient(*id);
            if (*a > 0.0 && b > 0.0) || (*a < 0.0 && b < 0.0) {
                let smaller = if a.abs() <= b.abs() { *a } else { b };
                kept.terms.insert(*id, smaller);
            }
        }
        let residual = self
            .sub(&kept)
            .bounds()
            .hull(&other.sub(&kept).bounds());
        if residual.is_singleton() {
            return kept.add_constant(residual.lo);
        }
        if !residual.is_bounded() {
            return kept.add_constant(residual.midpoint()).widen(f64::INFINITY);
        }
        kept.add_constant(residual.midpoint())
            .add_term(symbols.fresh(SymbolKind::Merge), residual.radius())
    }

    /// Substitutes symbols; coefficients of symbols mapped together add up.
    pub fn rename(&self, mapping: &BTreeMap<SymbolId, SymbolId>) -> Self {
        if mapping.is_empty() {
            return self.clone();
        }
        let mut result = Self {
            constant: self.constant,
            terms: BTreeMap::new(),
            slack: self.slack,
        };
        for (id, coef) in &self.terms {
            let target = mapping.get(id).copied().unwrap_or(*id);
            result = result.add_term(target, *coef);
        }
        result
    }

    /// Copy of the equation with a zero constant term.
    pub fn without_constant(&self) -> Self {
        Self {
            constant: 0.0,
            terms: self.terms.clone(),
            slack: self.slack,
        }
    }

    /// Upper bound on `|coefficient|` of every symbol, by symbol.
    pub fn contributions(&self) -> impl Iterator<Item = (SymbolId, f64)> + '_ {
        self.terms.iter().map(|(id, coef)| (*id, coef.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_symbols_cancel() {
        let mut symbols = SymbolTable::new(false);
        let eps = symbols.fresh(SymbolKind::Input);
        let x = LinearEquation::with_term(2.0, eps, 1.0);
        let zero = x.sub(&x);
        assert!(zero.is_constant());
        assert_eq!(zero.bounds(), Interval::point(0.0));
    }

    #[test]
    fn inexact_scaling_lands_in_slack() {
        let x = LinearEquation::constant(0.1);
        let scaled = x.scale(3.0);
        assert!(scaled.slack() > 0.0);
        assert!(scaled.bounds().lo < scaled.bounds().hi);
    }
}
