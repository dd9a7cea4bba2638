//! linhash: a single-threaded hash map that grows and shrinks one bucket at
//! a time using linear hashing.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: bound the cost of any single insert or removal. A conventional
//!   table doubles and rehashes everything at once; a linear hash table
//!   splits exactly one bucket per insert and merges exactly one bucket per
//!   removal, so a resize is spread over as many operations as it has
//!   buckets.
//! - Layers:
//!   - GrowableSeq<T>: ordered sequence with explicit size and capacity
//!     control. Backs the bucket-head array; its exact capacity is what the
//!     shrink policy reclaims.
//!   - HashStrategy / LinearKey: the hash function is a value passed at
//!     construction (Murmur3 by default, djb2, or any `BuildHasher`), and
//!     `LinearKey` routes string, byte and integer keys to it.
//!   - LinearHashMap<K, V, H>: entries live in a slot arena and are chained
//!     per bucket through slot keys; `split` and `modulus` decide which
//!     bucket a cached hash addresses.
//!
//! Addressing
//! - `addr = hash % modulus`; if `addr < split` the bucket was already split
//!   this round and `addr = hash % (2 * modulus)`.
//! - Insert of a new key: link it, then split bucket `split` and advance it.
//!   When `split` reaches `modulus`, the modulus doubles and `split` resets.
//! - Successful removal: unlink, then rewind `split` and merge bucket
//!   `split + modulus` back. When `split` would go below zero the modulus
//!   halves; if the bucket array's capacity then exceeds `shrink_factor`
//!   times its length, the excess is released.
//! - Because each new key advances the split once and each removal rewinds
//!   it once, `(modulus, split)` is a function of the entry count for a
//!   table that was never cleared.
//!
//! Constraints
//! - Single-threaded: no internal synchronization; `!Sync`.
//! - Entries cache their 32-bit hash; rebucketing never calls the hash
//!   strategy or `K: Eq`.
//! - At most one entry per key; `insert` overwrites, `insert_with` returns
//!   the existing entry.
//! - Absent keys are `None`/`false`, never errors.
//!
//! Reentrancy policy
//! - Lookups call user code (`K: Eq`, the hash strategy, value
//!   constructors). A debug-only guard panics if one of those calls back
//!   into the same map. Rebucketing runs no user code and is not guarded.
//! - Removed keys and values are returned to the caller or handed to a
//!   destructor only after the structure is consistent again.
//!
//! Observability
//! - `tracing` events: `trace` when a round completes or is rewound,
//!   `debug` when bucket capacity is reclaimed. The crate installs no
//!   subscriber.
//! - `LinearHashMap::validate` checks bucket placement, split bounds, key
//!   uniqueness and entry count without panicking.

pub mod error;
pub mod growable;
pub mod linear_hash_map;
mod linear_hash_map_proptest;
pub mod options;
mod reentrancy;
pub mod strategy;

// Public surface
pub use error::{ConfigError, InvariantError};
pub use growable::GrowableSeq;
pub use linear_hash_map::{linear_address, Handle, LinearHashMap};
pub use options::{Options, INITIAL_MODULUS, SHRINK_FACTOR};
pub use strategy::{BuildHasherStrategy, Djb2, HashStrategy, LinearKey, Murmur3};
