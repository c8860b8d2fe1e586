use proptest::prelude::*;

/// Strategy for generating sorted, de-duplicated key sets, dense or sparse
pub fn key_set_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop_oneof![
        // dense run starting anywhere
        (-1_000_000i64..1_000_000, 1usize..2_000)
            .prop_map(|(start, len)| (start..start + len as i64).collect::<Vec<_>>()),
        // sparse keys with gaps
        prop::collection::btree_set(-10_000_000i64..10_000_000, 1..500)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>()),
    ]
}

/// Strategy for requested worker counts, including more workers than keys
pub fn parallelism_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![Just(1usize), 1usize..=64, Just(4096usize)]
}

/// Strategy for block sizes
pub fn block_size_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![Just(1i64), 1i64..=250, Just(10_000i64)]
}

/// Key sets whose span stays small enough to enumerate every block
pub fn compact_key_set_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop_oneof![
        (-1_000i64..1_000, 1usize..2_000)
            .prop_map(|(start, len)| (start..start + len as i64).collect::<Vec<_>>()),
        prop::collection::btree_set(-5_000i64..5_000, 1..300)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>()),
    ]
}
