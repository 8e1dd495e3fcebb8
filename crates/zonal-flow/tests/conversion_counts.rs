use std::collections::BTreeSet;

use proptest::prelude::*;
use zonal_flow::{conversion_branch, conversion_number, OutcomeKind};

#[test]
fn documented_counts() {
    assert_eq!(conversion_number(0, 0, 5, 5), 2);
    assert_eq!(conversion_number(0, 9, 0, 9), 190);
    assert_eq!(conversion_number(0, 0, 0, 0), 1);
    assert_eq!(conversion_number(3, 3, 0, 4), 9);
}

#[test]
fn singleton_against_range_orders_mismatches() {
    let outcomes: Vec<_> = (0..conversion_number(2, 2, 1, 3))
        .filter_map(|index| conversion_branch(2, 2, 1, 3, index))
        .map(|o| (o.real, o.implementation, o.kind))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (Some(2), Some(2), OutcomeKind::Synchronized),
            (Some(2), Some(1), OutcomeKind::RealOnly),
            (Some(2), Some(3), OutcomeKind::RealOnly),
            (Some(2), Some(1), OutcomeKind::ImplementationOnly),
            (Some(2), Some(3), OutcomeKind::ImplementationOnly),
        ]
    );
}

proptest! {
    #[test]
    fn enumeration_matches_the_count(
        first_real in -4i128..4,
        real_len in 0i128..5,
        first_impl in -4i128..4,
        impl_len in 0i128..5,
    ) {
        let last_real = first_real + real_len - 1;
        let last_impl = first_impl + impl_len - 1;
        let count = conversion_number(first_real, last_real, first_impl, last_impl);
        let mut seen = BTreeSet::new();
        for index in 0..count {
            let outcome = conversion_branch(first_real, last_real, first_impl, last_impl, index);
            prop_assert!(outcome.is_some());
            let outcome = outcome.unwrap();
            if let Some(r) = outcome.real {
                prop_assert!(r >= first_real && r <= last_real);
            }
            if let Some(i) = outcome.implementation {
                prop_assert!(i >= first_impl && i <= last_impl);
            }
            if outcome.kind == OutcomeKind::Synchronized {
                prop_assert_eq!(outcome.real, outcome.implementation);
            } else if outcome.real.is_some() && outcome.implementation.is_some() {
                prop_assert_ne!(outcome.real, outcome.implementation);
            }
            prop_assert!(seen.insert((outcome.real, outcome.implementation, outcome.kind)));
        }
        prop_assert!(conversion_branch(first_real, last_real, first_impl, last_impl, count).is_none());
    }
}
