//! Plain Bloom filter with a dual physical representation
//!
//! A filter starts as a sorted index set and switches to a packed bitmap once
//! storing the indices would cost more than the bitmap (`Shape::is_sparse`).
//! The representation is never observable through the `BloomFilter` port.
//!
//! INVARIANTS:
//! - Every enabled index lies in `[0, m)`
//! - No false negatives: after `merge(h)`, `contains(h)` MUST return true

use std::collections::BTreeSet;

use bitvec::prelude::*;
use tracing::debug;

use super::bit_maps;
use super::Shape;
use crate::error::FilterError;
use crate::ports::{BitMapExtractor, BloomFilter, CellExtractor, IndexExtractor};

/// Physical bit storage.
#[derive(Clone, Debug)]
enum BitState {
    /// Enabled indices in ascending order
    Sparse(BTreeSet<i32>),
    /// `m` bits packed least significant bit first into `u64` words
    Dense(BitVec<u64, Lsb0>),
}

/// Bloom filter for probabilistic membership testing
///
/// A Bloom filter is a space-efficient probabilistic data structure that
/// can test whether an element is a member of a set. False positives are
/// possible, but false negatives are not.
#[derive(Clone, Debug)]
pub struct SimpleBloomFilter {
    shape: Shape,
    state: BitState,
}

impl SimpleBloomFilter {
    /// Create an empty filter.
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            state: BitState::Sparse(BTreeSet::new()),
        }
    }

    /// Build a filter directly from packed words. Bits beyond `m` are dropped.
    pub(crate) fn from_bit_maps(shape: Shape, mut words: Vec<u64>) -> Self {
        words.resize(shape.num_words(), 0);
        if let Some(last) = words.last_mut() {
            *last &= bit_maps::last_word_mask(shape.num_bits());
        }
        let mut bits = BitVec::<u64, Lsb0>::from_vec(words);
        bits.truncate(shape.num_bits() as usize);
        let mut filter = Self {
            shape,
            state: BitState::Dense(bits),
        };
        filter.sparsify();
        filter
    }

    /// Switch to the bitmap once the index set outgrows it.
    fn densify(&mut self) {
        let BitState::Sparse(indices) = &self.state else {
            return;
        };
        let cardinality = indices.len() as i32;
        if self.shape.is_sparse(cardinality) {
            return;
        }
        let mut bits = bitvec![u64, Lsb0; 0; self.shape.num_bits() as usize];
        for &index in indices {
            bits.set(index as usize, true);
        }
        debug!(
            cardinality,
            num_bits = self.shape.num_bits(),
            "Converting sparse filter to dense"
        );
        self.state = BitState::Dense(bits);
    }

    /// Switch back to the index set when the bitmap holds few enough bits.
    fn sparsify(&mut self) {
        let BitState::Dense(bits) = &self.state else {
            return;
        };
        if self.shape.is_sparse(bits.count_ones() as i32) {
            let indices = bits.iter_ones().map(|index| index as i32).collect();
            self.state = BitState::Sparse(indices);
        }
    }

    /// Validate every word of `bit_maps` against the shape.
    fn checked_words(&self, source: &dyn BitMapExtractor) -> Result<Vec<u64>, FilterError> {
        let num_bits = self.shape.num_bits();
        let num_words = self.shape.num_words();
        let mask = bit_maps::last_word_mask(num_bits);
        let words = source.as_bit_map_array();

        for (position, &word) in words.iter().enumerate() {
            let stray = if position + 1 < num_words {
                0
            } else if position + 1 == num_words {
                word & !mask
            } else {
                word
            };
            if stray != 0 {
                let index = position as i64 * 64 + i64::from(stray.trailing_zeros());
                return Err(FilterError::index_out_of_range(index, num_bits));
            }
        }
        Ok(words)
    }
}

impl PartialEq for SimpleBloomFilter {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.as_bit_map_array() == other.as_bit_map_array()
    }
}

impl Eq for SimpleBloomFilter {}

impl IndexExtractor for SimpleBloomFilter {
    fn process_indices(&self, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        match &self.state {
            BitState::Sparse(indices) => indices.iter().all(|&index| visit(index)),
            BitState::Dense(bits) => bits.iter_ones().all(|index| visit(index as i32)),
        }
    }
}

impl BitMapExtractor for SimpleBloomFilter {
    fn process_bit_maps(&self, visit: &mut dyn FnMut(u64) -> bool) -> bool {
        let num_words = self.shape.num_words();
        let mask = bit_maps::last_word_mask(self.shape.num_bits());
        match &self.state {
            BitState::Sparse(indices) => {
                let mut words = vec![0u64; num_words];
                for &index in indices {
                    words[bit_maps::long_index(index)] |= bit_maps::long_bit(index);
                }
                words.into_iter().all(|word| visit(word))
            }
            BitState::Dense(bits) => bits
                .as_raw_slice()
                .iter()
                .take(num_words)
                .enumerate()
                .all(|(position, &word)| {
                    if position + 1 == num_words {
                        visit(word & mask)
                    } else {
                        visit(word)
                    }
                }),
        }
    }
}

impl CellExtractor for SimpleBloomFilter {
    fn process_cells(&self, visit: &mut dyn FnMut(i32, i32) -> bool) -> bool {
        self.process_indices(&mut |index| visit(index, 1))
    }
}

impl BloomFilter for SimpleBloomFilter {
    fn new_empty(shape: Shape) -> Self {
        Self::new(shape)
    }

    fn shape(&self) -> Shape {
        self.shape
    }

    fn is_sparse(&self) -> bool {
        matches!(self.state, BitState::Sparse(_))
    }

    fn clear(&mut self) {
        self.state = BitState::Sparse(BTreeSet::new());
    }

    fn cardinality(&self) -> i32 {
        match &self.state {
            BitState::Sparse(indices) => indices.len() as i32,
            BitState::Dense(bits) => bits.count_ones() as i32,
        }
    }

    fn contains_indices(&self, indices: &dyn IndexExtractor) -> bool {
        match &self.state {
            BitState::Sparse(enabled) => indices.process_indices(&mut |index| enabled.contains(&index)),
            BitState::Dense(bits) => indices.process_indices(&mut |index| {
                index >= 0 && bits.get(index as usize).is_some_and(|bit| *bit)
            }),
        }
    }

    fn contains_bit_maps(&self, other: &dyn BitMapExtractor) -> bool {
        self.process_bit_map_pairs(other, &mut |mine, theirs| theirs & !mine == 0)
    }

    fn merge_indices(&mut self, indices: &dyn IndexExtractor) -> Result<(), FilterError> {
        let num_bits = self.shape.num_bits();
        let mut failure = None;
        match &mut self.state {
            BitState::Sparse(enabled) => {
                indices.process_indices(&mut |index| match bit_maps::check_range(index, num_bits) {
                    Ok(()) => {
                        enabled.insert(index);
                        true
                    }
                    Err(err) => {
                        failure = Some(err);
                        false
                    }
                });
            }
            BitState::Dense(bits) => {
                indices.process_indices(&mut |index| match bit_maps::check_range(index, num_bits) {
                    Ok(()) => {
                        bits.set(index as usize, true);
                        true
                    }
                    Err(err) => {
                        failure = Some(err);
                        false
                    }
                });
            }
        }
        self.densify();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn merge_bit_maps(&mut self, other: &dyn BitMapExtractor) -> Result<(), FilterError> {
        let words = self.checked_words(other)?;
        match &mut self.state {
            BitState::Sparse(enabled) => {
                for (position, &word) in words.iter().enumerate() {
                    let mut remaining = word;
                    while remaining != 0 {
                        let offset = remaining.trailing_zeros() as i32;
                        enabled.insert(position as i32 * 64 + offset);
                        remaining &= remaining - 1;
                    }
                }
            }
            BitState::Dense(bits) => {
                for (mine, theirs) in bits.as_raw_mut_slice().iter_mut().zip(words) {
                    *mine |= theirs;
                }
            }
        }
        self.densify();
        Ok(())
    }
}
