//! LinearHashMap: chained hash table that grows and shrinks one bucket at a
//! time (linear hashing).
//!
//! Layout
//! - `slots` is an arena of entries; each entry caches its 32-bit hash and
//!   links to the next entry of its bucket chain by slot key.
//! - `table` holds the chain heads. Its length is always `2 * modulus`; only
//!   the prefix `[0, split + modulus)` is addressable, the rest is headroom
//!   for the current round.
//! - Buckets below `split` were already split this round and address with
//!   `2 * modulus`; the others still use `modulus`.
//!
//! Every insert that creates an entry splits bucket `split` and advances it;
//! every successful removal rewinds `split` and merges the bucket it
//! uncovers. Doubling the table therefore costs one chain per insert instead
//! of one full rehash.

use crate::error::{ConfigError, InvariantError};
use crate::growable::GrowableSeq;
use crate::options::Options;
use crate::reentrancy::DebugReentrancy;
use crate::strategy::{HashStrategy, LinearKey, Murmur3};
use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;
use slotmap::{DefaultKey, SlotMap};
use tracing::{debug, trace};

/// Bucket index for `hash` given the current `modulus` and `split`.
#[inline]
pub fn linear_address(hash: u32, modulus: usize, split: usize) -> usize {
    let hash = hash as usize;
    let addr = hash % modulus;
    if addr < split {
        hash % (modulus << 1)
    } else {
        addr
    }
}

/// Stable reference to an entry. Resolves to `None` once the entry is
/// removed, even if its slot is reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub fn key<'a, K, V, H>(&self, map: &'a LinearHashMap<K, V, H>) -> Option<&'a K> {
        map.slots.get(self.0).map(|e| &e.key)
    }

    pub fn value<'a, K, V, H>(&self, map: &'a LinearHashMap<K, V, H>) -> Option<&'a V> {
        map.slots.get(self.0).map(|e| &e.value)
    }

    pub fn value_mut<'a, K, V, H>(&self, map: &'a mut LinearHashMap<K, V, H>) -> Option<&'a mut V> {
        map.slots.get_mut(self.0).map(|e| &mut e.value)
    }
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u32,
    next: Option<DefaultKey>,
}

pub struct LinearHashMap<K, V, H = Murmur3> {
    table: GrowableSeq<Option<DefaultKey>>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
    split: usize,
    modulus: usize,
    strategy: H,
    options: Options,
    reentrancy: DebugReentrancy,
}

impl<K, V> LinearHashMap<K, V> {
    pub fn new() -> Self {
        Self::with_strategy(Murmur3::default())
    }
}

impl<K, V> Default for LinearHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> LinearHashMap<K, V, H> {
    pub fn with_strategy(strategy: H) -> Self {
        Self::build(Options::default(), strategy)
    }

    pub fn with_options(options: Options, strategy: H) -> Result<Self, ConfigError> {
        Ok(Self::build(options.validate()?, strategy))
    }

    fn build(options: Options, strategy: H) -> Self {
        let modulus = options.initial_modulus;
        let mut table = GrowableSeq::new();
        table.set_size(modulus * 2);
        Self {
            table,
            slots: SlotMap::with_key(),
            split: 0,
            modulus,
            strategy,
            options,
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Base modulus of the current round.
    pub fn modulus(&self) -> usize {
        self.modulus
    }

    /// Next bucket to be split.
    pub fn split(&self) -> usize {
        self.split
    }

    /// Number of addressable buckets, `split + modulus`.
    pub fn bucket_count(&self) -> usize {
        self.split + self.modulus
    }

    /// Capacity of the bucket array.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn strategy(&self) -> &H {
        &self.strategy
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Chain length of every addressable bucket, in bucket order.
    pub fn chain_lengths(&self) -> Vec<usize> {
        self.live_heads()
            .iter()
            .map(|&head| Chain::new(&self.slots, head).count())
            .collect()
    }

    fn live_heads(&self) -> &[Option<DefaultKey>] {
        &self.table.as_slice()[..self.bucket_count()]
    }

    /// Visits entries in bucket-then-chain order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            heads: self.live_heads().iter(),
            cursor: None,
            remaining: self.slots.len(),
        }
    }

    /// Mutable iteration in storage order, which is unrelated to bucket
    /// order. Use [`for_each_mut`](Self::for_each_mut) to visit buckets in
    /// order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.slots.iter_mut(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }

    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V),
    {
        for (k, v) in self.iter() {
            visit(k, v);
        }
    }

    /// Like [`for_each`](Self::for_each) with mutable access to values.
    pub fn for_each_mut<F>(&mut self, mut visit: F)
    where
        F: FnMut(&K, &mut V),
    {
        for b in 0..self.bucket_count() {
            let mut cur = self.table[b];
            while let Some(id) = cur {
                let e = &mut self.slots[id];
                visit(&e.key, &mut e.value);
                cur = e.next;
            }
        }
    }

    /// Drop every entry. `modulus`, `split` and capacity are kept.
    pub fn clear(&mut self) {
        self.clear_with(|_, _| {});
    }

    /// Hand every entry to `destroy`, then empty the buckets. `modulus`,
    /// `split` and capacity are kept.
    pub fn clear_with<F>(&mut self, mut destroy: F)
    where
        F: FnMut(K, V),
    {
        for head in self.table.iter_mut() {
            *head = None;
        }
        for (_, e) in self.slots.drain() {
            destroy(e.key, e.value);
        }
    }

    /// Consume the map, handing every entry to `destroy`.
    pub fn destroy_with<F>(mut self, destroy: F)
    where
        F: FnMut(K, V),
    {
        self.clear_with(destroy);
    }

    // Prepend `chain`'s entries to the buckets the current (modulus, split)
    // assigns them, using their cached hashes.
    fn rebucket(&mut self, mut chain: Option<DefaultKey>) {
        while let Some(id) = chain {
            let e = &mut self.slots[id];
            let addr = linear_address(e.hash, self.modulus, self.split);
            chain = e.next;
            e.next = self.table[addr];
            self.table[addr] = Some(id);
        }
    }

    // Growth step: split bucket `split` and advance it, doubling the modulus
    // when the round completes.
    fn split_next(&mut self) {
        let chain = self.table[self.split].take();
        self.split += 1;
        if self.split == self.modulus {
            self.modulus *= 2;
            self.split = 0;
            self.table.set_size(self.modulus * 2);
            trace!(
                modulus = self.modulus,
                capacity = self.table.capacity(),
                "linear hash round complete"
            );
        }
        self.rebucket(chain);
    }

    // Shrink step: rewind `split` and merge the bucket it uncovers, halving
    // the modulus when a round is fully undone.
    fn merge_last(&mut self) {
        if self.split > 0 {
            self.split -= 1;
        } else if self.modulus > self.options.initial_modulus {
            self.modulus /= 2;
            self.split = self.modulus - 1;
            self.table.set_size(self.modulus * 2);
            trace!(modulus = self.modulus, "linear hash round rewound");

            let limit = self.table.len() * self.options.shrink_factor;
            if self.table.capacity() > limit {
                debug!(
                    from = self.table.capacity(),
                    to = limit,
                    "reclaiming bucket capacity"
                );
                self.table.set_capacity(limit);
            }
        } else {
            return;
        }
        let chain = self.table[self.split + self.modulus].take();
        self.rebucket(chain);
    }

    fn link_new(&mut self, hash: u32, key: K, value: V) -> DefaultKey {
        let addr = linear_address(hash, self.modulus, self.split);
        let id = self.slots.insert(Entry {
            key,
            value,
            hash,
            next: self.table[addr],
        });
        self.table[addr] = Some(id);
        self.split_next();
        id
    }

    fn unlink(&mut self, id: DefaultKey) -> Entry<K, V> {
        let (hash, next) = {
            let e = &self.slots[id];
            (e.hash, e.next)
        };
        let addr = linear_address(hash, self.modulus, self.split);
        if self.table[addr] == Some(id) {
            self.table[addr] = next;
        } else {
            let mut cur = self.table[addr];
            while let Some(c) = cur {
                let e = &mut self.slots[c];
                if e.next == Some(id) {
                    e.next = next;
                    break;
                }
                cur = e.next;
            }
            assert!(cur.is_some(), "entry missing from bucket {addr}");
        }
        match self.slots.remove(id) {
            Some(e) => e,
            None => unreachable!("live handle resolved to a vacant slot"),
        }
    }

    fn remove_id(&mut self, id: DefaultKey) -> (K, V) {
        let entry = self.unlink(id);
        self.merge_last();
        (entry.key, entry.value)
    }

    /// Remove the entry `handle` refers to. Stale handles return `None`.
    pub fn remove_handle(&mut self, handle: Handle) -> Option<(K, V)> {
        if !self.slots.contains_key(handle.0) {
            return None;
        }
        Some(self.remove_id(handle.0))
    }
}

impl<K, V, H> LinearHashMap<K, V, H>
where
    K: LinearKey + Eq,
    H: HashStrategy,
{
    fn locate<Q>(&self, hash: u32, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut cur = self.table[linear_address(hash, self.modulus, self.split)];
        while let Some(id) = cur {
            let e = &self.slots[id];
            if e.hash == hash && e.key.borrow() == q {
                return Some(id);
            }
            cur = e.next;
        }
        None
    }

    fn find_id<Q>(&self, op: &'static str, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + LinearKey + Eq,
    {
        let _g = self.reentrancy.enter(op);
        let hash = q.linear_hash(&self.strategy);
        self.locate(hash, q)
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + LinearKey + Eq,
    {
        self.find_id("find", q).map(Handle)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + LinearKey + Eq,
    {
        self.find_id("contains_key", q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + LinearKey + Eq,
    {
        let id = self.find_id("get", q)?;
        Some(&self.slots[id].value)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + LinearKey + Eq,
    {
        let id = self.find_id("get_key_value", q)?;
        let e = &self.slots[id];
        Some((&e.key, &e.value))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + LinearKey + Eq,
    {
        let id = self.find_id("get_mut", q)?;
        Some(&mut self.slots[id].value)
    }

    /// Find-or-create. Returns the existing entry's handle when `key` is
    /// present (`make` does not run, the table is untouched); otherwise
    /// stores `make()` and performs one growth step.
    pub fn insert_with<F>(&mut self, key: K, make: F) -> Handle
    where
        F: FnOnce() -> V,
    {
        let g = self.reentrancy.enter("insert");
        let hash = key.linear_hash(&self.strategy);
        if let Some(id) = self.locate(hash, &key) {
            return Handle(id);
        }
        let value = make();
        drop(g);
        Handle(self.link_new(hash, key, value))
    }

    pub fn get_or_insert_with<F>(&mut self, key: K, make: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let h = self.insert_with(key, make);
        &mut self.slots[h.0].value
    }

    /// Value slot for `key`, created as `V::default()` when absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Upsert. Overwrites the value of an existing key and returns the old
    /// one; the stored key is kept.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let g = self.reentrancy.enter("insert");
        let hash = key.linear_hash(&self.strategy);
        if let Some(id) = self.locate(hash, &key) {
            drop(g);
            return Some(core::mem::replace(&mut self.slots[id].value, value));
        }
        drop(g);
        self.link_new(hash, key, value);
        None
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + LinearKey + Eq,
    {
        let id = self.find_id("remove", q)?;
        Some(self.remove_id(id))
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + LinearKey + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    /// Remove `q`, handing its key and value to `destroy`. Returns whether an
    /// entry was removed.
    pub fn remove_with<Q, F>(&mut self, q: &Q, destroy: F) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + LinearKey + Eq,
        F: FnOnce(K, V),
    {
        match self.remove_entry(q) {
            Some((k, v)) => {
                destroy(k, v);
                true
            }
            None => false,
        }
    }

    /// Check the structural invariants: bucket placement, split bounds,
    /// bucket array size, key uniqueness and entry count.
    pub fn validate(&self) -> Result<(), InvariantError> {
        if self.split >= self.modulus {
            return Err(InvariantError::SplitOutOfRange {
                split: self.split,
                modulus: self.modulus,
            });
        }
        if self.modulus < self.options.initial_modulus {
            return Err(InvariantError::ModulusBelowInitial {
                modulus: self.modulus,
                initial: self.options.initial_modulus,
            });
        }
        if self.table.len() != self.modulus * 2 {
            return Err(InvariantError::TableSize {
                len: self.table.len(),
                expected: self.modulus * 2,
            });
        }

        let stored = self.slots.len();
        let mut reachable = 0usize;
        for (bucket, &head) in self.table.iter().enumerate() {
            if head.is_some() && bucket >= self.bucket_count() {
                return Err(InvariantError::DeadBucketOccupied { bucket });
            }
            let mut chain: Vec<&Entry<K, V>> = Vec::new();
            let mut cur = head;
            while let Some(id) = cur {
                let e = self
                    .slots
                    .get(id)
                    .ok_or(InvariantError::DanglingLink { bucket })?;
                reachable += 1;
                if reachable > stored {
                    return Err(InvariantError::CountMismatch { reachable, stored });
                }
                if e.key.linear_hash(&self.strategy) != e.hash {
                    return Err(InvariantError::StaleHash { bucket });
                }
                let expected = linear_address(e.hash, self.modulus, self.split);
                if expected != bucket {
                    return Err(InvariantError::Misplaced { bucket, expected });
                }
                if chain.iter().any(|other| other.key == e.key) {
                    return Err(InvariantError::DuplicateKey { bucket });
                }
                chain.push(e);
                cur = e.next;
            }
        }
        if reachable != stored {
            return Err(InvariantError::CountMismatch { reachable, stored });
        }
        Ok(())
    }
}

// Walks one bucket chain.
struct Chain<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    cur: Option<DefaultKey>,
}

impl<'a, K, V> Chain<'a, K, V> {
    fn new(slots: &'a SlotMap<DefaultKey, Entry<K, V>>, head: Option<DefaultKey>) -> Self {
        Self { slots, cur: head }
    }
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = &'a Entry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let e = &self.slots[self.cur?];
        self.cur = e.next;
        Some(e)
    }
}

/// Iterator over entries in bucket-then-chain order.
pub struct Iter<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    heads: core::slice::Iter<'a, Option<DefaultKey>>,
    cursor: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(id) = self.cursor {
                let e = &self.slots[id];
                self.cursor = e.next;
                self.remaining -= 1;
                return Some((&e.key, &e.value));
            }
            self.cursor = *self.heads.next()?;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over mutable entries, in storage order.
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, DefaultKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, e)| (&e.key, &mut e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

/// Owning iterator; yields entries in bucket-then-chain order.
pub struct IntoIter<K, V> {
    slots: SlotMap<DefaultKey, Entry<K, V>>,
    heads: std::vec::IntoIter<Option<DefaultKey>>,
    cursor: Option<DefaultKey>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(id) = self.cursor {
                let e = self.slots.remove(id)?;
                self.cursor = e.next;
                return Some((e.key, e.value));
            }
            self.cursor = self.heads.next()?;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.slots.len(), Some(self.slots.len()))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V, H> IntoIterator for LinearHashMap<K, V, H> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        let heads = self.live_heads().to_vec();
        IntoIter {
            slots: self.slots,
            heads: heads.into_iter(),
            cursor: None,
        }
    }
}

impl<'a, K, V, H> IntoIterator for &'a LinearHashMap<K, V, H> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, H> IntoIterator for &'a mut LinearHashMap<K, V, H> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V, H> Extend<(K, V)> for LinearHashMap<K, V, H>
where
    K: LinearKey + Eq,
    H: HashStrategy,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, H> FromIterator<(K, V)> for LinearHashMap<K, V, H>
where
    K: LinearKey + Eq,
    H: HashStrategy + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_strategy(H::default());
        map.extend(iter);
        map
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H> fmt::Debug for LinearHashMap<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Djb2;
    use std::cell::Cell;
    use std::collections::BTreeSet;

    /// Sends every key to the same bucket.
    #[derive(Clone, Copy, Default)]
    struct ConstStrategy;
    impl HashStrategy for ConstStrategy {
        fn hash_bytes(&self, _bytes: &[u8]) -> u32 {
            0
        }
        fn hash_int(&self, _value: i64) -> u32 {
            0
        }
    }

    /// Hashes an integer key to itself, so bucket positions are predictable.
    #[derive(Clone, Copy, Default)]
    struct IdentityStrategy;
    impl HashStrategy for IdentityStrategy {
        fn hash_bytes(&self, bytes: &[u8]) -> u32 {
            Djb2.hash_bytes(bytes)
        }
        fn hash_int(&self, value: i64) -> u32 {
            value as u32
        }
    }

    #[test]
    fn linear_address_uses_wide_modulus_below_split() {
        // modulus 4, split 2: buckets 0 and 1 were split into 0/4 and 1/5.
        assert_eq!(linear_address(4, 4, 2), 4);
        assert_eq!(linear_address(8, 4, 2), 0);
        assert_eq!(linear_address(5, 4, 2), 5);
        assert_eq!(linear_address(6, 4, 2), 2);
        assert_eq!(linear_address(7, 4, 0), 3);
    }

    /// Invariant: a fresh map starts at the initial modulus with a bucket array
    /// pre-sized to twice that.
    #[test]
    fn fresh_map_shape() {
        let m: LinearHashMap<String, i32> = LinearHashMap::new();
        assert_eq!(m.modulus(), 2);
        assert_eq!(m.split(), 0);
        assert_eq!(m.bucket_count(), 2);
        assert_eq!(m.capacity(), 4);
        assert!(m.is_empty());
        m.validate().unwrap();
    }

    /// Invariant: each new key advances the split by one; completing a round
    /// doubles the modulus.
    #[test]
    fn growth_advances_split_per_insert() {
        let mut m: LinearHashMap<i32, i32, IdentityStrategy> =
            LinearHashMap::with_strategy(IdentityStrategy);
        let mut shapes = Vec::new();
        for k in 0..7 {
            m.insert(k, k);
            shapes.push((m.modulus(), m.split()));
            m.validate().unwrap();
        }
        assert_eq!(
            shapes,
            vec![(2, 1), (4, 0), (4, 1), (4, 2), (4, 3), (8, 0), (8, 1)]
        );
        assert_eq!(m.capacity(), 16);
    }

    /// Invariant: updating an existing key leaves the table shape alone.
    #[test]
    fn upsert_does_not_grow() {
        let mut m: LinearHashMap<&'static str, i32> = LinearHashMap::new();
        assert_eq!(m.insert("a", 1), None);
        let shape = (m.modulus(), m.split(), m.len());
        assert_eq!(m.insert("a", 2), Some(1));
        *m.get_or_insert_default("a") += 1;
        assert_eq!((m.modulus(), m.split(), m.len()), shape);
        assert_eq!(m.get("a"), Some(&3));
    }

    /// Invariant: removal rewinds exactly what insertion advanced; a miss does
    /// nothing.
    #[test]
    fn removal_rewinds_split() {
        let mut m: LinearHashMap<i32, (), IdentityStrategy> =
            LinearHashMap::with_strategy(IdentityStrategy);
        for k in 0..5 {
            m.insert(k, ());
        }
        assert_eq!((m.modulus(), m.split()), (4, 3));

        assert_eq!(m.remove(&99), None);
        assert_eq!((m.modulus(), m.split()), (4, 3));

        let mut shapes = Vec::new();
        for k in (0..5).rev() {
            assert_eq!(m.remove(&k), Some(()));
            shapes.push((m.modulus(), m.split()));
            m.validate().unwrap();
        }
        assert_eq!(shapes, vec![(4, 2), (4, 1), (4, 0), (2, 1), (2, 0)]);
    }

    /// Invariant: at the initial modulus with nothing split there is nothing
    /// to merge, even after `clear` left the shape behind.
    #[test]
    fn shrink_stops_at_initial_modulus() {
        let mut m: LinearHashMap<i32, i32> = LinearHashMap::new();
        m.insert(1, 1);
        m.remove(&1);
        assert_eq!((m.modulus(), m.split()), (2, 0));
        m.validate().unwrap();
    }

    /// Invariant: `clear` keeps modulus, split and capacity; later inserts and
    /// removals stay consistent.
    #[test]
    fn clear_keeps_shape() {
        let mut m: LinearHashMap<i32, i32> = LinearHashMap::new();
        for k in 0..100 {
            m.insert(k, k);
        }
        let shape = (m.modulus(), m.split(), m.capacity());
        m.clear();
        assert!(m.is_empty());
        assert_eq!((m.modulus(), m.split(), m.capacity()), shape);
        m.validate().unwrap();

        m.insert(7, 7);
        assert_eq!(m.remove(&7), Some(7));
        assert_eq!((m.modulus(), m.split()), (shape.0, shape.1));
        m.validate().unwrap();
    }

    #[test]
    fn clear_with_visits_every_entry() {
        let mut m: LinearHashMap<String, u32> = LinearHashMap::new();
        for i in 0..20u32 {
            m.insert(format!("k{i}"), i);
        }
        let mut total = 0;
        let mut keys = BTreeSet::new();
        m.clear_with(|k, v| {
            keys.insert(k);
            total += v;
        });
        assert_eq!(total, (0..20).sum());
        assert_eq!(keys.len(), 20);
        assert!(m.is_empty());
    }

    /// Invariant: lookups work when every key collides; removal from the
    /// middle of a chain relinks it.
    #[test]
    fn collisions_resolve_by_equality() {
        let mut m: LinearHashMap<String, i32, ConstStrategy> =
            LinearHashMap::with_strategy(ConstStrategy);
        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            m.insert(k.to_string(), i as i32);
        }
        assert_eq!(m.chain_lengths().iter().sum::<usize>(), 4);
        assert_eq!(m.chain_lengths()[0], 4);
        assert_eq!(m.remove("b"), Some(1));
        assert_eq!(m.get("a"), Some(&0));
        assert_eq!(m.get("c"), Some(&2));
        assert_eq!(m.get("d"), Some(&3));
        assert!(!m.contains_key("b"));
        m.validate().unwrap();
    }

    /// Invariant: handles go stale on removal and never alias a new entry.
    #[test]
    fn stale_handle_does_not_alias_new_entry() {
        let mut m: LinearHashMap<String, i32> = LinearHashMap::new();
        let h1 = m.insert_with("old".to_string(), || 1);
        assert_eq!(m.remove_handle(h1), Some(("old".to_string(), 1)));
        let h2 = m.insert_with("new".to_string(), || 2);
        assert_ne!(h1, h2);
        assert!(h1.value(&m).is_none());
        assert_eq!(m.remove_handle(h1), None);
        assert_eq!(h2.key(&m).map(String::as_str), Some("new"));
        *h2.value_mut(&mut m).unwrap() += 40;
        assert_eq!(m.get("new"), Some(&42));
    }

    /// Invariant: `insert_with` runs its constructor only when it creates.
    #[test]
    fn insert_with_is_lazy() {
        let mut m: LinearHashMap<&'static str, String> = LinearHashMap::new();
        let calls = Cell::new(0);
        let h1 = m.insert_with("k", || {
            calls.set(calls.get() + 1);
            "v".to_string()
        });
        let h2 = m.insert_with("k", || {
            calls.set(calls.get() + 1);
            "v2".to_string()
        });
        assert_eq!(calls.get(), 1);
        assert_eq!(h1, h2);
        assert_eq!(m.find("k"), Some(h1));
        assert_eq!(h1.value(&m).map(String::as_str), Some("v"));
    }

    /// Invariant: `iter` walks buckets in order and sees every entry once.
    #[test]
    fn iteration_is_bucket_ordered() {
        let mut m: LinearHashMap<u32, u32, IdentityStrategy> =
            LinearHashMap::with_strategy(IdentityStrategy);
        for k in 0..6 {
            m.insert(k, k * 10);
        }
        let order: Vec<u32> = m.keys().copied().collect();
        let buckets: Vec<usize> = order
            .iter()
            .map(|&k| linear_address(k, m.modulus(), m.split()))
            .collect();
        let mut sorted = buckets.clone();
        sorted.sort_unstable();
        assert_eq!(buckets, sorted);
        assert_eq!(m.iter().len(), 6);

        let mut visited = Vec::new();
        m.for_each(|k, v| visited.push((*k, *v)));
        assert_eq!(visited.iter().map(|(k, _)| *k).collect::<Vec<_>>(), order);

        m.for_each_mut(|_, v| *v += 1);
        for v in m.values_mut() {
            *v += 1;
        }
        assert_eq!(m.get(&3), Some(&32));

        let drained: Vec<u32> = m.into_iter().map(|(k, _)| k).collect();
        assert_eq!(drained, order);
    }

    #[test]
    fn borrowed_str_keys() {
        let owned = vec!["x".to_string(), "y".to_string()];
        let mut m: LinearHashMap<&str, usize> = LinearHashMap::new();
        for (i, s) in owned.iter().enumerate() {
            m.insert(s.as_str(), i);
        }
        assert_eq!(m.get("y"), Some(&1));
        assert_eq!(m.get_key_value("x"), Some((&"x", &0)));
    }

    #[test]
    fn with_options_rejects_bad_config() {
        let r = LinearHashMap::<i32, i32, Djb2>::with_options(Options::new().initial_modulus(0), Djb2);
        assert!(matches!(r, Err(ConfigError::ZeroModulus)));

        let m = LinearHashMap::<i32, i32, Djb2>::with_options(Options::new().initial_modulus(3), Djb2)
            .unwrap();
        assert_eq!(m.modulus(), 3);
        assert_eq!(m.capacity(), 6);
    }

    /// Invariant: a non-power-of-two initial modulus still shrinks back to
    /// exactly itself.
    #[test]
    fn odd_initial_modulus_round_trip() {
        let mut m =
            LinearHashMap::<i32, i32, Djb2>::with_options(Options::new().initial_modulus(3), Djb2)
                .unwrap();
        for k in 0..200 {
            m.insert(k, -k);
        }
        m.validate().unwrap();
        for k in 0..200 {
            assert_eq!(m.remove(&k), Some(-k));
        }
        assert_eq!((m.modulus(), m.split()), (3, 0));
        m.validate().unwrap();
    }

    #[test]
    fn validate_reports_misplaced_entry() {
        let mut m: LinearHashMap<i32, i32, IdentityStrategy> =
            LinearHashMap::with_strategy(IdentityStrategy);
        m.insert(1, 1);
        m.validate().unwrap();
        // Move the entry into the wrong bucket behind the map's back.
        let head = m.table[1].take();
        m.table[0] = head;
        assert_eq!(
            m.validate(),
            Err(InvariantError::Misplaced {
                bucket: 0,
                expected: 1
            })
        );
    }

    #[test]
    fn debug_formats_as_map() {
        let mut m: LinearHashMap<&str, i32> = LinearHashMap::new();
        m.insert("only", 1);
        assert_eq!(format!("{m:?}"), r#"{"only": 1}"#);
    }
}
