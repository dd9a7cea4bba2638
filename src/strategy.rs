//! Hash strategies and the key trait that routes keys to them.
//!
//! A `HashStrategy` turns key bytes or integers into the 32-bit hash the
//! linear hash table addresses with. The strategy is a value chosen when the
//! map is built, so two maps in one program can hash differently.

use core::hash::{BuildHasher, Hasher};
use hashbrown::hash_map::DefaultHashBuilder;
use std::borrow::Cow;

/// Produces 32-bit hashes for string/byte keys and fixed-width integer keys.
pub trait HashStrategy {
    fn hash_bytes(&self, bytes: &[u8]) -> u32;

    /// Hash an integer key. Integers are widened to `i64` by `LinearKey`
    /// impls, so `7u8` and `7i64` hash the same.
    fn hash_int(&self, value: i64) -> u32 {
        self.hash_bytes(&value.to_le_bytes())
    }
}

impl<H: HashStrategy + ?Sized> HashStrategy for &H {
    fn hash_bytes(&self, bytes: &[u8]) -> u32 {
        (**self).hash_bytes(bytes)
    }

    fn hash_int(&self, value: i64) -> u32 {
        (**self).hash_int(value)
    }
}

/// MurmurHash3, x86 32-bit variant.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Murmur3 {
    pub seed: u32,
}

impl Murmur3 {
    pub const fn with_seed(seed: u32) -> Self {
        Self { seed }
    }
}

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

#[inline]
fn murmur_mix(mut k: u32) -> u32 {
    k = k.wrapping_mul(C1);
    k = k.rotate_left(15);
    k.wrapping_mul(C2)
}

#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^ (h >> 16)
}

impl HashStrategy for Murmur3 {
    fn hash_bytes(&self, bytes: &[u8]) -> u32 {
        let mut h = self.seed;
        let mut blocks = bytes.chunks_exact(4);
        for block in &mut blocks {
            let k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
            h ^= murmur_mix(k);
            h = h.rotate_left(13);
            h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
        }

        let tail = blocks.remainder();
        if !tail.is_empty() {
            let k = tail
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
            h ^= murmur_mix(k);
        }

        // The reference implementation mixes in the length as a 32-bit int.
        h ^= bytes.len() as u32;
        fmix32(h)
    }
}

/// Bernstein's djb2: `h = h * 33 + byte`, starting from 5381.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Djb2;

impl HashStrategy for Djb2 {
    fn hash_bytes(&self, bytes: &[u8]) -> u32 {
        bytes.iter().fold(5381u32, |h, &b| {
            (h << 5).wrapping_add(h).wrapping_add(u32::from(b))
        })
    }
}

/// Adapts any `BuildHasher` into a `HashStrategy` by folding its 64-bit
/// output to 32 bits.
#[derive(Clone, Debug, Default)]
pub struct BuildHasherStrategy<S = DefaultHashBuilder> {
    build: S,
}

impl<S> BuildHasherStrategy<S> {
    pub fn new(build: S) -> Self {
        Self { build }
    }

    pub fn build_hasher_ref(&self) -> &S {
        &self.build
    }
}

impl<S: BuildHasher> HashStrategy for BuildHasherStrategy<S> {
    fn hash_bytes(&self, bytes: &[u8]) -> u32 {
        let mut hasher = self.build.build_hasher();
        hasher.write(bytes);
        fold64(hasher.finish())
    }

    fn hash_int(&self, value: i64) -> u32 {
        let mut hasher = self.build.build_hasher();
        hasher.write_i64(value);
        fold64(hasher.finish())
    }
}

#[inline]
fn fold64(h: u64) -> u32 {
    (h ^ (h >> 32)) as u32
}

/// Keys a `LinearHashMap` can store or be queried with.
///
/// Lookups take `&Q` where `K: Borrow<Q>`, so `Q` (e.g. `str` for `String`
/// keys) must hash exactly like `K`. All string-like impls hash their UTF-8
/// bytes and all integer impls hash their value widened to `i64`.
pub trait LinearKey {
    fn linear_hash<H: HashStrategy + ?Sized>(&self, strategy: &H) -> u32;
}

impl LinearKey for str {
    #[inline]
    fn linear_hash<H: HashStrategy + ?Sized>(&self, strategy: &H) -> u32 {
        strategy.hash_bytes(self.as_bytes())
    }
}

impl LinearKey for String {
    #[inline]
    fn linear_hash<H: HashStrategy + ?Sized>(&self, strategy: &H) -> u32 {
        self.as_str().linear_hash(strategy)
    }
}

impl LinearKey for Box<str> {
    #[inline]
    fn linear_hash<H: HashStrategy + ?Sized>(&self, strategy: &H) -> u32 {
        (**self).linear_hash(strategy)
    }
}

impl LinearKey for Cow<'_, str> {
    #[inline]
    fn linear_hash<H: HashStrategy + ?Sized>(&self, strategy: &H) -> u32 {
        self.as_ref().linear_hash(strategy)
    }
}

impl LinearKey for [u8] {
    #[inline]
    fn linear_hash<H: HashStrategy + ?Sized>(&self, strategy: &H) -> u32 {
        strategy.hash_bytes(self)
    }
}

impl LinearKey for Vec<u8> {
    #[inline]
    fn linear_hash<H: HashStrategy + ?Sized>(&self, strategy: &H) -> u32 {
        self.as_slice().linear_hash(strategy)
    }
}

// Borrowed keys (`&'a str`, `&'a [u8]`) hash like what they point to.
impl<T: LinearKey + ?Sized> LinearKey for &T {
    #[inline]
    fn linear_hash<H: HashStrategy + ?Sized>(&self, strategy: &H) -> u32 {
        (**self).linear_hash(strategy)
    }
}

macro_rules! int_linear_key {
    ($($t:ty),*) => {
        $(
            impl LinearKey for $t {
                #[inline]
                fn linear_hash<H: HashStrategy + ?Sized>(&self, strategy: &H) -> u32 {
                    strategy.hash_int(*self as i64)
                }
            }
        )*
    };
}

int_linear_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
