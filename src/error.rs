//! Error types.
//!
//! Absent keys are not errors; lookups return `Option`. The only recoverable
//! failure is a rejected configuration. `InvariantError` is what
//! `LinearHashMap::validate` reports when the bucket structure is corrupt.

use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("initial modulus must be at least 1")]
    ZeroModulus,
    #[error("shrink factor must be at least 2, got {0}")]
    ShrinkFactorTooSmall(usize),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum InvariantError {
    #[error("split {split} is not below modulus {modulus}")]
    SplitOutOfRange { split: usize, modulus: usize },
    #[error("modulus {modulus} is below the initial modulus {initial}")]
    ModulusBelowInitial { modulus: usize, initial: usize },
    #[error("bucket array holds {len} slots, expected {expected}")]
    TableSize { len: usize, expected: usize },
    #[error("bucket {bucket} lies past the split region but is not empty")]
    DeadBucketOccupied { bucket: usize },
    #[error("bucket {bucket} links to a vacant entry slot")]
    DanglingLink { bucket: usize },
    #[error("entry in bucket {bucket} belongs in bucket {expected}")]
    Misplaced { bucket: usize, expected: usize },
    #[error("entry in bucket {bucket} has a cached hash that does not match its key")]
    StaleHash { bucket: usize },
    #[error("bucket {bucket} holds two entries with equal keys")]
    DuplicateKey { bucket: usize },
    #[error("{reachable} entries reachable from buckets, {stored} stored")]
    CountMismatch { reachable: usize, stored: usize },
}
