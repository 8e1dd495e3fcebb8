use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use zonal_core::{Interval, SourceLocation};

use crate::merge_table::MergeTable;

/// Identifier of a noise symbol; never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(u64);

impl SymbolId {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// What introduced a noise symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    /// Uncertainty of an input range.
    Input,
    /// Rounding error of one implementation operation.
    Rounding,
    /// Remainder of a linearized nonlinear operation.
    Linearization,
    /// Fold of low-influence symbols.
    Simplification,
    /// Residual of an affine join.
    Merge,
    /// Interval hull of a non-affine result.
    Hull,
}

/// Bookkeeping entry of one noise symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseSymbol {
    /// Identifier.
    pub id: SymbolId,
    /// Origin kind.
    pub kind: SymbolKind,
    /// Source location active at creation, when origins are tracked.
    pub origin: Option<SourceLocation>,
    /// Set once no live equation references the symbol.
    pub retired: bool,
}

impl NoiseSymbol {
    /// Range the symbol ranges over.
    pub fn range(&self) -> Interval {
        Interval::UNIT
    }
}

/// Allocator and registry of every noise symbol of a session.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<NoiseSymbol>,
    site: Option<SourceLocation>,
    track_origin: bool,
    merge_table: MergeTable,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new(track_origin: bool) -> Self {
        Self {
            track_origin,
            ..Self::default()
        }
    }

    /// Allocates a fresh symbol.
    pub fn fresh(&mut self, kind: SymbolKind) -> SymbolId {
        let id = SymbolId::from_raw(self.symbols.len() as u64);
        let origin = if self.track_origin {
            self.site.clone()
        } else {
            None
        };
        self.symbols.push(NoiseSymbol {
            id,
            kind,
            origin,
            retired: false,
        });
        id
    }

    /// Looks up a symbol.
    pub fn get(&self, id: SymbolId) -> Option<&NoiseSymbol> {
        self.symbols.get(id.as_raw() as usize)
    }

    /// Number of symbols ever allocated.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether no symbol was allocated yet.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Identifier the next allocation will receive.
    pub fn cursor(&self) -> u64 {
        self.symbols.len() as u64
    }

    /// Sets the location recorded as origin of later allocations.
    pub fn set_site(&mut self, site: Option<SourceLocation>) {
        self.site = site;
    }

    /// Location currently recorded as origin.
    pub fn site(&self) -> Option<&SourceLocation> {
        self.site.as_ref()
    }

    /// Whether allocations record their origin.
    pub fn tracks_origin(&self) -> bool {
        self.track_origin
    }

    /// Region-scoped symbol identification table.
    pub fn merge_table(&self) -> &MergeTable {
        &self.merge_table
    }

    /// Mutable access to the merge table.
    pub fn merge_table_mut(&mut self) -> &mut MergeTable {
        &mut self.merge_table
    }

    /// Marks the start of a new pass of the innermost region.
    pub fn begin_pass(&mut self) {
        let cursor = self.cursor();
        self.merge_table.begin_pass(cursor);
    }

    /// Retires every symbol outside `live`; returns how many were newly retired.
    pub fn retire_unreferenced(&mut self, live: &BTreeSet<SymbolId>) -> usize {
        self.retire_from(0, live)
    }

    /// Retires the symbols allocated from identifier `first` on that are
    /// outside `live`; returns how many were newly retired.
    ///
    /// A retired symbol forgets its origin.
    pub fn retire_from(&mut self, first: u64, live: &BTreeSet<SymbolId>) -> usize {
        let start = usize::try_from(first).map_or(self.symbols.len(), |first| first.min(self.symbols.len()));
        let mut retired = 0;
        for symbol in &mut self.symbols[start..] {
            if !symbol.retired && !live.contains(&symbol.id) {
                symbol.retired = true;
                symbol.origin = None;
                retired += 1;
            }
        }
        retired
    }

    /// Number of symbols still referenced.
    pub fn live_count(&self) -> usize {
        self.symbols.iter().filter(|s| !s.retired).count()
    }
}
