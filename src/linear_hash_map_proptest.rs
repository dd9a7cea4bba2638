#![cfg(test)]

// Property tests for LinearHashMap kept inside the crate so they can inspect
// the bucket array directly as well as through `validate`.

use crate::linear_hash_map::{linear_address, Handle, LinearHashMap};
use crate::strategy::{Djb2, HashStrategy, LinearKey, Murmur3};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}
impl LinearKey for Key {
    fn linear_hash<H: HashStrategy + ?Sized>(&self, strategy: &H) -> u32 {
        self.0.linear_hash(strategy)
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys and
// shorter op lists.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    InsertWith(usize, i32),
    Remove(usize),
    RemoveHandle(usize),
    Find(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::InsertWith(i, v)),
            4 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::RemoveHandle),
            2 => idx.clone().prop_map(Op::Find),
            2 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(Op::Contains),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Every live entry must sit in the bucket its cached-hash address names, and
// nothing may live past `split + modulus`.
fn assert_placement<H: HashStrategy>(m: &LinearHashMap<Key, i32, H>) -> Result<(), TestCaseError> {
    prop_assert_eq!(m.validate(), Ok(()));
    for (k, _) in m.iter() {
        let bucket = linear_address(k.linear_hash(m.strategy()), m.modulus(), m.split());
        prop_assert!(bucket < m.bucket_count());
    }
    prop_assert_eq!(m.chain_lengths().len(), m.bucket_count());
    prop_assert_eq!(m.chain_lengths().iter().sum::<usize>(), m.len());
    Ok(())
}

fn run_state_machine<H: HashStrategy>(
    mut sut: LinearHashMap<Key, i32, H>,
    pool: Vec<String>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut live: HashMap<Key, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();
    // Entries inserted since the last clear; the split position is a
    // function of this count.
    let mut since_clear: isize = 0;
    let mut base_shape = (sut.modulus(), sut.split());

    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = key_from(&pool, i);
                let before = (sut.modulus(), sut.split());
                let prev = sut.insert(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k.clone(), v));
                if prev.is_some() {
                    prop_assert_eq!((sut.modulus(), sut.split()), before);
                } else {
                    since_clear += 1;
                    let h = sut.find(&k).expect("inserted key is findable");
                    live.insert(k, h);
                }
            }
            Op::InsertWith(i, v) => {
                let k = key_from(&pool, i);
                let mut ran = false;
                let h = sut.insert_with(k.clone(), || {
                    ran = true;
                    v
                });
                prop_assert_eq!(ran, !model.contains_key(&k));
                if ran {
                    since_clear += 1;
                    model.insert(k.clone(), v);
                    live.insert(k, h);
                } else {
                    prop_assert_eq!(Some(&h), live.get(&k));
                }
            }
            Op::Remove(i) => {
                let k = key_from(&pool, i);
                let before = (sut.modulus(), sut.split());
                let got = sut.remove(k.0.as_str());
                prop_assert_eq!(got, model.remove(&k));
                if got.is_some() {
                    since_clear -= 1;
                    stale.push(live.remove(&k).expect("tracked handle"));
                } else {
                    prop_assert_eq!((sut.modulus(), sut.split()), before);
                }
            }
            Op::RemoveHandle(i) => {
                let k = key_from(&pool, i);
                if let Some(h) = live.remove(&k) {
                    let (kk, vv) = sut.remove_handle(h).expect("live handle removes");
                    prop_assert_eq!(&kk, &k);
                    prop_assert_eq!(Some(vv), model.remove(&k));
                    since_clear -= 1;
                    stale.push(h);
                }
            }
            Op::Find(i) => {
                let k = key_from(&pool, i);
                let found = sut.find(&k);
                prop_assert_eq!(found.is_some(), model.contains_key(&k));
                if let Some(h) = found {
                    prop_assert_eq!(Some(&h), live.get(&k));
                }
            }
            Op::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            Op::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.wrapping_add(d);
                    let mv = model.get_mut(&k).expect("present in model");
                    *mv = mv.wrapping_add(d);
                }
            }
            Op::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().count(), model.len());
            }
            Op::Clear => {
                sut.clear();
                model.clear();
                stale.extend(live.drain().map(|(_, h)| h));
                since_clear = 0;
                base_shape = (sut.modulus(), sut.split());
            }
        }

        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert!(since_clear >= 0);
        // Without a clear in between, modulus and split are fully determined
        // by how many entries were added since the table was fresh.
        if base_shape == (2, 0) {
            let n = since_clear as usize;
            let mut modulus = 2usize;
            let mut split = 0usize;
            for _ in 0..n {
                split += 1;
                if split == modulus {
                    modulus *= 2;
                    split = 0;
                }
            }
            prop_assert_eq!((sut.modulus(), sut.split()), (modulus, split));
        }
        assert_placement(&sut)?;
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap,
// with bucket placement, stale handles and the split/modulus shape checked
// after every operation.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_murmur3((pool, ops) in arb_scenario()) {
        run_state_machine(LinearHashMap::with_strategy(Murmur3::default()), pool, ops)?;
    }

    #[test]
    fn prop_state_machine_djb2((pool, ops) in arb_scenario()) {
        run_state_machine(LinearHashMap::with_strategy(Djb2), pool, ops)?;
    }
}

// Every key hashes to zero, so the whole map is one chain in bucket 0.
#[derive(Clone, Copy, Default)]
struct ConstStrategy;
impl HashStrategy for ConstStrategy {
    fn hash_bytes(&self, _bytes: &[u8]) -> u32 {
        0
    }
}

// Property: the same invariants under worst-case collisions.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(LinearHashMap::with_strategy(ConstStrategy), pool, ops)?;
    }
}

// Property: any insert/erase interleaving over integers leaves every key in
// its computed bucket, and erasing everything returns to the initial shape.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_integer_keys_round_trip(keys in proptest::collection::vec(any::<i64>(), 0..400)) {
        let mut m: LinearHashMap<i64, usize> = LinearHashMap::new();
        for (i, k) in keys.iter().enumerate() {
            m.insert(*k, i);
        }
        prop_assert_eq!(m.validate(), Ok(()));
        let distinct: BTreeSet<i64> = keys.iter().copied().collect();
        prop_assert_eq!(m.len(), distinct.len());
        for k in &distinct {
            prop_assert!(m.contains_key(k));
        }
        for k in distinct.iter().rev() {
            prop_assert!(m.remove(k).is_some());
            prop_assert_eq!(m.validate(), Ok(()));
        }
        prop_assert!(m.is_empty());
        prop_assert_eq!((m.modulus(), m.split()), (2, 0));
        prop_assert!(m.capacity() <= 4 * 4);
    }
}
