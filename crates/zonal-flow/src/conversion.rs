//! Counting and enumeration of the outcome pairs of a divergent decision.
//!
//! A decision whose real outcome lies in `[first_real, last_real]` and whose
//! implementation outcome lies in `[first_impl, last_impl]` is explored once
//! per identical pair and twice per mismatched pair: once following the real
//! outcome and once following the implementation outcome.

use serde::{Deserialize, Serialize};

fn size(first: i128, last: i128) -> u128 {
    if first > last {
        0
    } else {
        last.abs_diff(first).saturating_add(1)
    }
}

fn common(first_real: i128, last_real: i128, first_impl: i128, last_impl: i128) -> (i128, i128) {
    (first_real.max(first_impl), last_real.min(last_impl))
}

/// Number of branches needed to explore every outcome pair.
///
/// An empty range yields the other range's size. Otherwise the count is
/// `2·real·impl − common`, which reduces to `2·larger − common` when either
/// range is a singleton.
pub fn conversion_number(first_real: i128, last_real: i128, first_impl: i128, last_impl: i128) -> u128 {
    let real = size(first_real, last_real);
    let implementation = size(first_impl, last_impl);
    if real == 0 {
        return implementation;
    }
    if implementation == 0 {
        return real;
    }
    let (lo, hi) = common(first_real, last_real, first_impl, last_impl);
    let shared = size(lo, hi);
    if real == 1 || implementation == 1 {
        return real.max(implementation).saturating_mul(2) - shared;
    }
    real.saturating_mul(implementation)
        .saturating_mul(2)
        .saturating_sub(shared)
}

/// Which domains continue along an enumerated outcome pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    /// Both domains take the same outcome.
    Synchronized,
    /// The real domain continues; the implementation takes another outcome.
    RealOnly,
    /// The implementation continues; the real domain takes another outcome.
    ImplementationOnly,
}

/// One enumerated outcome pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// Real outcome, absent when the real range is empty.
    pub real: Option<i128>,
    /// Implementation outcome, absent when the implementation range is empty.
    pub implementation: Option<i128>,
    /// Domains following the pair.
    pub kind: OutcomeKind,
}

impl ConversionOutcome {
    /// Outcome the continuing domain observes.
    pub fn followed(&self) -> Option<i128> {
        match self.kind {
            OutcomeKind::Synchronized | OutcomeKind::RealOnly => self.real,
            OutcomeKind::ImplementationOnly => self.implementation,
        }
    }
}

/// `index`-th outcome pair in canonical order.
///
/// Identical values come first in increasing order, then real-only mismatches
/// ordered by `(real, impl)`, then implementation-only mismatches ordered by
/// `(impl, real)`. Returns `None` past the last branch.
pub fn conversion_branch(
    first_real: i128,
    last_real: i128,
    first_impl: i128,
    last_impl: i128,
    index: u128,
) -> Option<ConversionOutcome> {
    let real = size(first_real, last_real);
    let implementation = size(first_impl, last_impl);
    if real == 0 {
        return offset(first_impl, index, implementation).map(|value| ConversionOutcome {
            real: None,
            implementation: Some(value),
            kind: OutcomeKind::ImplementationOnly,
        });
    }
    if implementation == 0 {
        return offset(first_real, index, real).map(|value| ConversionOutcome {
            real: Some(value),
            implementation: None,
            kind: OutcomeKind::RealOnly,
        });
    }

    let (lo, hi) = common(first_real, last_real, first_impl, last_impl);
    let shared = size(lo, hi);
    if index < shared {
        let value = offset(lo, index, shared)?;
        return Some(ConversionOutcome {
            real: Some(value),
            implementation: Some(value),
            kind: OutcomeKind::Synchronized,
        });
    }
    let mismatches = real.checked_mul(implementation)? - shared;
    let index = index - shared;
    if index < mismatches {
        let (r, i) = nth_mismatch((first_real, last_real), (first_impl, last_impl), index)?;
        return Some(ConversionOutcome {
            real: Some(r),
            implementation: Some(i),
            kind: OutcomeKind::RealOnly,
        });
    }
    let index = index - mismatches;
    if index < mismatches {
        let (i, r) = nth_mismatch((first_impl, last_impl), (first_real, last_real), index)?;
        return Some(ConversionOutcome {
            real: Some(r),
            implementation: Some(i),
            kind: OutcomeKind::ImplementationOnly,
        });
    }
    None
}

fn offset(first: i128, index: u128, len: u128) -> Option<i128> {
    if index >= len {
        return None;
    }
    first.checked_add(i128::try_from(index).ok()?)
}

/// `index`-th pair `(a, b)` with `a != b`, ordered by `(a, b)`.
fn nth_mismatch(major: (i128, i128), minor: (i128, i128), mut index: u128) -> Option<(i128, i128)> {
    let minor_len = size(minor.0, minor.1);
    let mut a = major.0;
    loop {
        if a > major.1 {
            return None;
        }
        let excluded = a >= minor.0 && a <= minor.1;
        let row = minor_len - u128::from(excluded);
        if index < row {
            let mut b = offset(minor.0, index, minor_len)?;
            if excluded && b >= a {
                b += 1;
            }
            return Some((a, b));
        }
        index -= row;
        a = a.checked_add(1)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_ranges_split_two_ways() {
        assert_eq!(conversion_number(0, 0, 5, 5), 2);
        assert_eq!(conversion_number(0, 0, 0, 0), 1);
        assert_eq!(conversion_number(0, 9, 0, 9), 190);
    }

    #[test]
    fn empty_range_counts_the_other() {
        assert_eq!(conversion_number(1, 0, 3, 6), 4);
        assert_eq!(conversion_number(2, 4, 1, 0), 3);
    }

    #[test]
    fn boolean_top_enumerates_six_outcomes() {
        let pairs: Vec<_> = (0..conversion_number(0, 1, 0, 1))
            .map(|index| conversion_branch(0, 1, 0, 1, index).map(|o| (o.real, o.implementation, o.kind)))
            .collect();
        assert_eq!(
            pairs,
            vec![
                Some((Some(0), Some(0), OutcomeKind::Synchronized)),
                Some((Some(1), Some(1), OutcomeKind::Synchronized)),
                Some((Some(0), Some(1), OutcomeKind::RealOnly)),
                Some((Some(1), Some(0), OutcomeKind::RealOnly)),
                Some((Some(1), Some(0), OutcomeKind::ImplementationOnly)),
                Some((Some(0), Some(1), OutcomeKind::ImplementationOnly)),
            ]
        );
        assert_eq!(conversion_branch(0, 1, 0, 1, 6), None);
    }
}
