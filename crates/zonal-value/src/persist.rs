//! Diagnosis records of zonotope values.

use std::cmp::Ordering;

use tracing::debug;
use zonal_affine::SymbolTable;
use zonal_core::rounding::add_up;
use zonal_core::DomainMode;
use zonal_flow::{DiagnosisRecord, OriginContribution, Session};

use crate::zonotope::Zonotope;

impl Zonotope {
    /// Error contribution of each symbol origin, largest first.
    ///
    /// Symbols sharing a creation site and kind are summed, rounding upward.
    pub fn origin_contributions(&self, symbols: &SymbolTable) -> Vec<OriginContribution> {
        let mut origins: Vec<OriginContribution> = Vec::new();
        if self.mode != DomainMode::RealAndImplementation {
            return origins;
        }
        for (id, magnitude) in self.error.contributions() {
            let Some(symbol) = symbols.get(id) else {
                continue;
            };
            match origins
                .iter_mut()
                .find(|entry| entry.kind == symbol.kind && entry.location == symbol.origin)
            {
                Some(entry) => entry.magnitude = add_up(entry.magnitude, magnitude),
                None => origins.push(OriginContribution {
                    location: symbol.origin.clone(),
                    kind: symbol.kind,
                    magnitude,
                }),
            }
        }
        origins.sort_by(|a, b| {
            b.magnitude
                .partial_cmp(&a.magnitude)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.location.cmp(&b.location))
        });
        origins
    }

    fn record(&self, prefix: &str, light: bool, symbols: &SymbolTable) -> DiagnosisRecord {
        let scalar = match self.implementation_range() {
            Some(range) => range.midpoint(),
            None => self.real_bound.midpoint(),
        };
        let origins = if light || !symbols.tracks_origin() {
            Vec::new()
        } else {
            self.origin_contributions(symbols)
        };
        DiagnosisRecord {
            prefix: prefix.to_owned(),
            mode: self.mode,
            real: self.real_range(),
            implementation: self.implementation_range(),
            error: self.error_range(),
            scalar,
            concrete: self.implementation,
            origins,
            light,
        }
    }

    /// Appends the ranges, midpoint and error origins of the value to the
    /// session's diagnosis log under `prefix`.
    pub fn persist(&self, prefix: &str, session: &mut Session) {
        let record = self.record(prefix, false, session.symbols());
        debug!(prefix, scalar = record.scalar, origins = record.origins.len(), "value persisted");
        session.diagnosis_mut().push(record);
    }

    /// Like [`Zonotope::persist`] without error origins.
    pub fn light_persist(&self, prefix: &str, session: &mut Session) {
        let record = self.record(prefix, true, session.symbols());
        session.diagnosis_mut().push(record);
    }
}
