//! Index generators
//!
//! Uses double hashing: index(i) = h1 + i * h2 (mod m), so one 128-bit hash
//! serves all k hash functions.
//!
//! - `IncrementingHasher`: plain arithmetic sequence, fully predictable
//! - `EnhancedDoubleHasher`: Kirsch-Mitzenmacher enhanced double hashing
//!   seeded from MurmurHash3 (bytes) or SipHash-1-3 (any `Hash` item)

use std::hash::Hash;
use std::io::Cursor;

use siphasher::sip128::{Hasher128, SipHasher13};

use super::bit_maps;
use super::Shape;
use crate::ports::Hasher;

/// Arithmetic hasher: the i-th index is `(initial + i * increment) mod m`.
///
/// Negative values are reduced with a floor modulus, so every index lands in
/// `[0, m)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IncrementingHasher {
    initial: i64,
    increment: i64,
}

impl IncrementingHasher {
    /// Create a hasher starting at `initial` and stepping by `increment`.
    pub fn new(initial: i64, increment: i64) -> Self {
        Self { initial, increment }
    }
}

impl Hasher for IncrementingHasher {
    fn process_indices(&self, shape: &Shape, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        let bits = i64::from(shape.num_bits());
        let mut index = self.initial.rem_euclid(bits);
        let increment = self.increment.rem_euclid(bits);
        for _ in 0..shape.num_hashes() {
            if !visit(index as i32) {
                return false;
            }
            index += increment;
            if index >= bits {
                index -= bits;
            }
        }
        true
    }
}

/// Enhanced double hashing over a 128-bit hash split into `initial` and
/// `increment`.
///
/// The increment is adjusted by a tetrahedral term at every step, which
/// avoids the short cycles plain double hashing falls into when the
/// increment shares a factor with `m`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnhancedDoubleHasher {
    initial: u64,
    increment: u64,
}

impl EnhancedDoubleHasher {
    /// Create a hasher from the two halves of a 128-bit hash.
    pub fn new(initial: u64, increment: u64) -> Self {
        Self { initial, increment }
    }

    /// Hash `bytes` with MurmurHash3 x64 128 (seed 0).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut cursor = Cursor::new(bytes);
        let hash = murmur3::murmur3_x64_128(&mut cursor, 0).unwrap_or(0);
        Self::new(hash as u64, (hash >> 64) as u64)
    }

    /// Hash any `Hash` item with SipHash-1-3 128.
    pub fn from_item<T: Hash + ?Sized>(item: &T) -> Self {
        let mut hasher = SipHasher13::new();
        item.hash(&mut hasher);
        let hash = hasher.finish128();
        Self::new(hash.h1, hash.h2)
    }

    /// First half of the hash.
    pub fn initial(&self) -> u64 {
        self.initial
    }

    /// Second half of the hash.
    pub fn increment(&self) -> u64 {
        self.increment
    }
}

impl Hasher for EnhancedDoubleHasher {
    fn process_indices(&self, shape: &Shape, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        let bits = shape.num_bits();
        let k = shape.num_hashes();

        // More functions than bits: every bit gets set, so emit 0..m in blocks.
        if k > bits {
            let mut remaining = k;
            while remaining > 0 {
                let block = remaining.min(bits);
                remaining -= block;
                if !(0..block).all(|index| visit(index)) {
                    return false;
                }
            }
            return true;
        }

        let mut index = bit_maps::modulo(self.initial, bits);
        if !visit(index) {
            return false;
        }
        let mut increment = bit_maps::modulo(self.increment, bits);
        for i in 1..k {
            index -= increment;
            if index < 0 {
                index += bits;
            }
            if !visit(index) {
                return false;
            }
            increment -= i;
            if increment < 0 {
                increment += bits;
            }
        }
        true
    }
}
