//! Participation of zonotope values in region merges.

use std::collections::BTreeSet;

use zonal_affine::{LinearEquation, SymbolId, SymbolTable};
use zonal_core::{DomainMode, Interval};
use zonal_flow::{Contribution, MergeValue};

use crate::zonotope::Zonotope;

#[derive(Debug, Clone)]
struct Part {
    form: LinearEquation,
    bound: Interval,
}

impl Part {
    fn absorb(&mut self, other: Part, symbols: &mut SymbolTable) {
        self.form = self.form.join(&other.form, symbols);
        self.bound = self.bound.hull(&other.bound);
    }
}

fn fold(slot: &mut Option<Part>, part: Option<Part>, symbols: &mut SymbolTable) {
    let Some(part) = part else {
        return;
    };
    match slot {
        Some(current) => current.absorb(part, symbols),
        None => *slot = Some(part),
    }
}

/// Running merge of the contributions of one variable.
///
/// Real and implementation forms are joined separately. The error form is
/// joined as well while every contribution tracked both domains; otherwise
/// the merged error is rebuilt as `implementation − real`.
#[derive(Debug, Clone)]
pub struct ZonotopeMerge {
    real: Option<Part>,
    implementation: Option<Part>,
    error: Option<LinearEquation>,
    synchronized: bool,
    scalar: Option<(f64, bool)>,
}

impl ZonotopeMerge {
    /// Domains that received at least one contribution.
    pub fn covered(&self) -> Option<DomainMode> {
        DomainMode::from_halves(self.real.is_some(), self.implementation.is_some())
    }

    /// Whether every contribution so far tracked both domains.
    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }
}

/// Halves of a value renamed through the innermost merge table.
struct Renamed {
    real: Option<Part>,
    implementation: Option<Part>,
    error: Option<LinearEquation>,
    scalar: Option<f64>,
}

impl Zonotope {
    fn renamed(&self, contribution: &Contribution, symbols: &mut SymbolTable) -> Renamed {
        let ids = self.real.symbols().into_iter().chain(self.error.symbols());
        let mapping = symbols.merge_table_mut().canonicalize(ids);
        let tracks_real = contribution.mode.tracks_real() && self.mode.tracks_real();
        let tracks_implementation =
            contribution.mode.tracks_implementation() && self.mode.tracks_implementation();
        let real_form = self.real.rename(&mapping);
        let error_form = self.error.rename(&mapping);
        let implementation = tracks_implementation.then(|| Part {
            form: match self.mode {
                DomainMode::OnlyImplementation => real_form.clone(),
                _ => real_form.add(&error_form),
            },
            bound: self.implementation_bound,
        });
        Renamed {
            real: tracks_real.then(|| Part {
                form: real_form,
                bound: self.real_bound,
            }),
            error: (tracks_real && tracks_implementation).then_some(error_form),
            implementation,
            scalar: tracks_implementation.then_some(self.implementation),
        }
    }
}

impl MergeValue for Zonotope {
    type Accumulator = ZonotopeMerge;

    fn optimize_value(&mut self) -> bool {
        Zonotope::optimize_value(self)
    }

    fn referenced_symbols(&self) -> BTreeSet<SymbolId> {
        let mut ids = self.real.symbols();
        ids.extend(self.error.symbols());
        ids
    }

    fn record_from(&self, contribution: &Contribution, symbols: &mut SymbolTable) -> ZonotopeMerge {
        let renamed = self.renamed(contribution, symbols);
        ZonotopeMerge {
            synchronized: renamed.error.is_some(),
            real: renamed.real,
            implementation: renamed.implementation,
            error: renamed.error,
            scalar: renamed.scalar.map(|value| (value, contribution.concrete)),
        }
    }

    fn merge_with(&self, accumulator: &mut ZonotopeMerge, contribution: &Contribution, symbols: &mut SymbolTable) {
        let renamed = self.renamed(contribution, symbols);
        fold(&mut accumulator.real, renamed.real, symbols);
        fold(&mut accumulator.implementation, renamed.implementation, symbols);
        accumulator.error = match (accumulator.synchronized, accumulator.error.take(), renamed.error) {
            (true, Some(current), Some(error)) => Some(current.join(&error, symbols)),
            _ => {
                accumulator.synchronized = false;
                None
            }
        };
        if let Some(value) = renamed.scalar {
            let replace = match accumulator.scalar {
                None => true,
                Some((_, concrete)) => !concrete && contribution.concrete,
            };
            if replace {
                accumulator.scalar = Some((value, contribution.concrete));
            }
        }
    }

    fn finish(accumulator: ZonotopeMerge, required: DomainMode, _symbols: &mut SymbolTable) -> Option<Zonotope> {
        let ZonotopeMerge {
            real,
            implementation,
            error,
            synchronized,
            scalar,
        } = accumulator;
        match required {
            DomainMode::RealAndImplementation => {
                let real = real?;
                let implementation = implementation?;
                let error = match error {
                    Some(error) if synchronized => error,
                    _ => implementation.form.sub(&real.form),
                };
                let scalar = clamped(scalar, &implementation.bound);
                Some(Zonotope {
                    real: real.form,
                    error,
                    implementation: scalar,
                    real_bound: real.bound,
                    implementation_bound: implementation.bound,
                    mode: required,
                })
            }
            DomainMode::OnlyReal => {
                let real = real?;
                let scalar = scalar.map_or_else(|| real.bound.midpoint(), |(value, _)| value);
                Some(Zonotope {
                    real: real.form,
                    error: LinearEquation::zero(),
                    implementation: scalar,
                    real_bound: real.bound,
                    implementation_bound: Interval::ENTIRE,
                    mode: required,
                })
            }
            DomainMode::OnlyImplementation => {
                let implementation = implementation?;
                let scalar = clamped(scalar, &implementation.bound);
                Some(Zonotope {
                    real: implementation.form,
                    error: LinearEquation::zero(),
                    implementation: scalar,
                    real_bound: implementation.bound,
                    implementation_bound: implementation.bound,
                    mode: required,
                })
            }
        }
    }
}

fn clamped(scalar: Option<(f64, bool)>, bound: &Interval) -> f64 {
    match scalar {
        Some((value, _)) if bound.contains(value) => value,
        _ => bound.midpoint(),
    }
}
