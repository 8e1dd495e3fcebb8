use std::collections::BTreeSet;

use zonal_affine::{SymbolId, SymbolTable};
use zonal_core::{DomainMode, ErrorInfo, SourceLocation, ZonalError};

/// Circumstances of one pass contributing to a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    /// Domains the pass tracked when it completed.
    pub mode: DomainMode,
    /// Whether the pass followed the concrete implementation execution.
    pub concrete: bool,
}

/// Values that can be snapshotted and merged across the passes of a region.
pub trait MergeValue: Clone {
    /// Running merge of the contributions seen so far.
    type Accumulator;

    /// Tightens the value; `false` when it is proven infeasible.
    fn optimize_value(&mut self) -> bool;

    /// Noise symbols the value still references.
    fn referenced_symbols(&self) -> BTreeSet<SymbolId>;

    /// Starts a merge from the first feasible contribution.
    fn record_from(&self, contribution: &Contribution, symbols: &mut SymbolTable) -> Self::Accumulator;

    /// Widens the merge so it also covers this contribution.
    fn merge_with(
        &self,
        accumulator: &mut Self::Accumulator,
        contribution: &Contribution,
        symbols: &mut SymbolTable,
    );

    /// Merged value tracking `required`, or `None` when some required domain
    /// received no contribution.
    fn finish(
        accumulator: Self::Accumulator,
        required: DomainMode,
        symbols: &mut SymbolTable,
    ) -> Option<Self>;
}

/// Snapshots of region variables, restored in reverse order.
#[derive(Debug, Clone)]
pub struct SaveMemory<T> {
    frames: Vec<(usize, T)>,
}

impl<T: Clone> Default for SaveMemory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> SaveMemory<T> {
    /// Empty snapshot list.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Adds a snapshot of `value` under `handle`.
    pub fn save(mut self, handle: usize, value: &T) -> Self {
        self.frames.push((handle, value.clone()));
        self
    }

    /// Snapshots every variable of `vars`.
    pub fn capture(vars: &[T]) -> Self {
        vars.iter()
            .enumerate()
            .fold(Self::new(), |memory, (handle, value)| memory.save(handle, value))
    }

    /// Number of snapshots.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether nothing was saved.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Writes the snapshots back, last saved first.
    pub fn restore(&self, vars: &mut [T]) {
        for (handle, value) in self.frames.iter().rev() {
            if let Some(slot) = vars.get_mut(*handle) {
                *slot = value.clone();
            }
        }
    }
}

struct MergeFrame<A> {
    handle: usize,
    accumulator: Option<A>,
}

/// Running merge of region variables across passes.
pub struct MergeMemory<T: MergeValue> {
    frames: Vec<MergeFrame<T::Accumulator>>,
    contributions: usize,
    excluded: usize,
    is_complete: bool,
}

impl<T: MergeValue> MergeMemory<T> {
    /// Merge over the listed handles.
    pub fn new(handles: impl IntoIterator<Item = usize>) -> Self {
        Self {
            frames: handles
                .into_iter()
                .map(|handle| MergeFrame {
                    handle,
                    accumulator: None,
                })
                .collect(),
            contributions: 0,
            excluded: 0,
            is_complete: true,
        }
    }

    /// Merge over every variable of a slice of `len` values.
    pub fn for_all(len: usize) -> Self {
        Self::new(0..len)
    }

    /// Feasible passes merged so far.
    pub fn contributions(&self) -> usize {
        self.contributions
    }

    /// Passes excluded as infeasible.
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// Whether every pass so far contributed.
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// Records a pass that produced no contribution.
    pub fn mark_incomplete(&mut self) {
        self.excluded += 1;
        self.is_complete = false;
    }

    /// Folds the values of a completed pass; `false` when the pass is infeasible.
    pub fn absorb(&mut self, vars: &mut [T], contribution: &Contribution, symbols: &mut SymbolTable) -> bool {
        let mut feasible = true;
        for frame in &self.frames {
            if let Some(value) = vars.get_mut(frame.handle) {
                feasible &= value.optimize_value();
            }
        }
        if !feasible {
            self.mark_incomplete();
            return false;
        }
        for frame in &mut self.frames {
            let Some(value) = vars.get(frame.handle) else {
                continue;
            };
            match frame.accumulator.as_mut() {
                None => frame.accumulator = Some(value.record_from(contribution, symbols)),
                Some(accumulator) => value.merge_with(accumulator, contribution, symbols),
            }
        }
        self.contributions += 1;
        true
    }

    /// Stores the merged values into `vars`.
    pub fn write_back(
        self,
        vars: &mut [T],
        required: DomainMode,
        symbols: &mut SymbolTable,
        location: &SourceLocation,
    ) -> Result<(), ZonalError> {
        for frame in self.frames {
            let uncovered = || {
                ZonalError::EmptyBranch(
                    ErrorInfo::new("uncovered-domain", "no feasible pass covers the variable")
                        .at(location)
                        .with_context("handle", frame.handle)
                        .with_context("mode", format!("{required:?}")),
                )
            };
            let Some(accumulator) = frame.accumulator else {
                return Err(uncovered());
            };
            let merged = T::finish(accumulator, required, symbols).ok_or_else(uncovered)?;
            if let Some(slot) = vars.get_mut(frame.handle) {
                *slot = merged;
            }
        }
        Ok(())
    }
}
