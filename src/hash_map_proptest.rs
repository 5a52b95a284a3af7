#![cfg(test)]

// Property tests for HashMap kept inside the crate so they can reach the slot
// table dump and the invariant checker without the `stats` feature.

use std::collections::HashMap as StdMap;
use std::collections::HashSet as StdSet;

use proptest::prelude::*;

use crate::entry_store::ChunkedArrayStore;
use crate::entry_store::EntryStore;
use crate::entry_store::SingleArrayStore;
use crate::hash_map::HashMap;
use crate::strategy::Fibonacci;
use crate::strategy::KeyStrategy;
use crate::strategy::Natural;
use crate::strategy::RawInteger;

#[derive(Clone, Debug)]
enum Op {
    Insert(u32, i32),
    GetOrInsert(u32, i32),
    Remove(u32),
    Get(u32),
    Mutate(u32, i32),
    Clear,
    Iterate,
}

// Keys come from a narrow range so that updates, removals and reinsertions of
// the same key are frequent. Clear is rare so that tables get to grow.
fn arb_ops(key_range: u32) -> impl Strategy<Value = Vec<Op>> {
    let key = 0..key_range;
    let op = prop_oneof![
        8 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        3 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::GetOrInsert(k, v)),
        5 => key.clone().prop_map(Op::Remove),
        3 => key.clone().prop_map(Op::Get),
        2 => (key.clone(), any::<i32>()).prop_map(|(k, d)| Op::Mutate(k, d)),
        1 => Just(Op::Iterate),
        1 => Just(Op::Clear),
    ];
    proptest::collection::vec(op, 1..400)
}

// Property: state-machine equivalence against std::collections::HashMap.
// After every operation:
// - every occupied slot's ideal index, recovered from its position and probe
//   count, equals the key's hash masked to the table, and the stored fragment
//   matches the hash;
// - no two slots refer to the same record and the live record count equals
//   the occupied slot count;
// - the table never fills up, so every probe walk terminates;
// - `len`, `get` and iteration agree with the model.
fn run<S, E>(strategy: S, ops: Vec<Op>) -> Result<(), TestCaseError>
where
    S: KeyStrategy<u32>,
    E: EntryStore<u32, i32>,
{
    let mut sut: HashMap<u32, i32, S, E> = HashMap::with_strategy(strategy);
    let mut model: StdMap<u32, i32> = StdMap::new();

    for op in ops {
        match op {
            Op::Insert(k, v) => {
                prop_assert_eq!(sut.insert(k, v), model.insert(k, v));
            }
            Op::GetOrInsert(k, v) => {
                let expected = *model.entry(k).or_insert(v);
                let mut calls = 0;
                let got = *sut.get_or_insert_with(k, || {
                    calls += 1;
                    v
                });
                prop_assert_eq!(got, expected);
                prop_assert!(calls <= 1);
            }
            Op::Remove(k) => {
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
                prop_assert!(!sut.contains_key(&k));
            }
            Op::Get(k) => {
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            Op::Mutate(k, d) => {
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.wrapping_add(d);
                }
                if let Some(v) = model.get_mut(&k) {
                    *v = v.wrapping_add(d);
                }
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
            Op::Iterate => {
                let seen: StdMap<u32, i32> = sut.iter().map(|(k, v)| (*k, *v)).collect();
                prop_assert_eq!(seen.len(), sut.len());
                prop_assert_eq!(&seen, &model);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        sut.assert_invariants();
    }

    let dumped: StdSet<u32> = sut
        .slot_table()
        .slots()
        .map(|s| *sut.entry_store().key(s.entry_index))
        .collect();
    prop_assert_eq!(dumped.len(), model.len());
    for k in model.keys() {
        prop_assert!(dumped.contains(k));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_fibonacci_single_array(ops in arb_ops(300)) {
        run::<_, SingleArrayStore<u32, i32>>(Fibonacci, ops)?;
    }

    #[test]
    fn prop_fibonacci_chunked(ops in arb_ops(300)) {
        run::<_, ChunkedArrayStore<u32, i32>>(Fibonacci, ops)?;
    }

    #[test]
    fn prop_natural_single_array(ops in arb_ops(1000)) {
        run::<Natural, SingleArrayStore<u32, i32>>(Natural::default(), ops)?;
    }

    #[test]
    fn prop_natural_chunked(ops in arb_ops(1000)) {
        run::<Natural, ChunkedArrayStore<u32, i32>>(Natural::default(), ops)?;
    }

    // Sequential integers under the identity hash form long runs of adjacent
    // clusters, which stresses wrap-around and backward shifting.
    #[test]
    fn prop_raw_integer_dense_keys(ops in arb_ops(64)) {
        run::<_, SingleArrayStore<u32, i32>>(RawInteger, ops)?;
    }
}
