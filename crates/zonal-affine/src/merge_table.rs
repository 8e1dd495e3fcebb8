use std::collections::BTreeMap;

use crate::symbol::SymbolId;

#[derive(Debug, Clone, Default)]
struct RegionFrame {
    pass_start: u64,
    canonical: BTreeMap<u64, SymbolId>,
}

/// Identifies the pass-local symbols of sibling passes of a region.
///
/// Inside a region, the n-th symbol allocated during a pass is renamed to the
/// n-th symbol of the first pass that allocated one, so merged values keep a
/// single copy of each pass-local symbol. Symbols allocated before the current
/// pass are left untouched. Renaming is injective within a pass.
#[derive(Debug, Clone, Default)]
pub struct MergeTable {
    frames: Vec<RegionFrame>,
}

impl MergeTable {
    /// Opens a region scope.
    pub fn enter_region(&mut self, cursor: u64) {
        self.frames.push(RegionFrame {
            pass_start: cursor,
            canonical: BTreeMap::new(),
        });
    }

    /// Records where the symbols of the current pass start.
    pub fn begin_pass(&mut self, cursor: u64) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pass_start = cursor;
        }
    }

    /// Closes the innermost region scope.
    pub fn leave_region(&mut self) {
        self.frames.pop();
    }

    /// Number of open region scopes.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Canonical name of `id` in the innermost region.
    pub fn canonical(&mut self, id: SymbolId) -> SymbolId {
        let Some(frame) = self.frames.last_mut() else {
            return id;
        };
        if id.as_raw() < frame.pass_start {
            return id;
        }
        let ordinal = id.as_raw() - frame.pass_start;
        *frame.canonical.entry(ordinal).or_insert(id)
    }

    /// Canonical names of a set of symbols; identity entries are omitted.
    pub fn canonicalize(
        &mut self,
        ids: impl IntoIterator<Item = SymbolId>,
    ) -> BTreeMap<SymbolId, SymbolId> {
        let mut mapping = BTreeMap::new();
        for id in ids {
            let canonical = self.canonical(id);
            if canonical != id {
                mapping.insert(id, canonical);
            }
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_passes_share_ordinals() {
        let mut table = MergeTable::default();
        table.enter_region(10);
        table.begin_pass(10);
        assert_eq!(table.canonical(SymbolId::from_raw(10)), SymbolId::from_raw(10));
        assert_eq!(table.canonical(SymbolId::from_raw(11)), SymbolId::from_raw(11));
        table.begin_pass(14);
        assert_eq!(table.canonical(SymbolId::from_raw(15)), SymbolId::from_raw(11));
        assert_eq!(table.canonical(SymbolId::from_raw(16)), SymbolId::from_raw(16));
        assert_eq!(table.canonical(SymbolId::from_raw(3)), SymbolId::from_raw(3));
        table.leave_region();
        assert_eq!(table.canonical(SymbolId::from_raw(15)), SymbolId::from_raw(15));
    }
}
