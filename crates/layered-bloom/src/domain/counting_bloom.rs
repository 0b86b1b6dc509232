//! # Counting Bloom Filter
//!
//! Allows incremental add/remove without full rebuild.
//!
//! ## Solution: Counting Bloom Filter (CBF)
//!
//! Replace bits with counters:
//! - Add: Increment counters at hashed positions
//! - Remove: Decrement counters at hashed positions
//! - Membership: True if all counters > 0
//!
//! Each item bumps a cell once even if its hasher repeats an index, so
//! removing the item restores the previous counts exactly.
//!
//! A cell driven below zero (removing something never added) makes the
//! filter invalid. Its counts are no longer trustworthy, but every operation
//! keeps working.

use std::collections::BTreeMap;

use tracing::warn;

use super::bit_maps;
use super::index_filter::UniqueIndices;
use super::Shape;
use crate::error::FilterError;
use crate::ports::{BitMapExtractor, BloomFilter, CellExtractor, Hasher, IndexExtractor};

/// Largest value a single cell can hold.
pub const MAX_CELL: i32 = i32::MAX;

/// Counting Bloom filter with one `i32` counter per bit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountingBloomFilter {
    shape: Shape,
    cells: Vec<i32>,
}

impl CountingBloomFilter {
    /// Create an empty counting filter.
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            cells: vec![0; shape.num_bits() as usize],
        }
    }

    /// Add `cells` to the counters.
    ///
    /// Nothing is changed when an error is returned.
    ///
    /// # Errors
    /// `InvalidIndex` for an index outside `[0, m)`, `CounterOverflow` if a
    /// counter would exceed [`MAX_CELL`].
    pub fn add(&mut self, cells: &dyn CellExtractor) -> Result<(), FilterError> {
        self.apply(cells, i32::checked_add)
    }

    /// Subtract `cells` from the counters.
    ///
    /// # Errors
    /// `InvalidIndex` for an index outside `[0, m)`, `CounterOverflow` if a
    /// counter would fall below `i32::MIN`.
    pub fn subtract(&mut self, cells: &dyn CellExtractor) -> Result<(), FilterError> {
        self.apply(cells, i32::checked_sub)
    }

    /// Undo one `merge` of `hasher`.
    ///
    /// Removing an item that was never merged causes false negatives and
    /// may leave the filter invalid.
    ///
    /// # Errors
    /// `InvalidIndex` if the hasher does not honour the shape.
    pub fn remove(&mut self, hasher: &dyn Hasher) -> Result<(), FilterError> {
        let unique = UniqueIndices::new(hasher, self.shape);
        self.subtract(&ones(&unique))
    }

    /// True while no counter is negative.
    pub fn is_valid(&self) -> bool {
        self.cells.iter().all(|&count| count >= 0)
    }

    /// Largest value a single cell can hold.
    pub fn max_cell(&self) -> i32 {
        MAX_CELL
    }

    /// How many times `hasher` could be removed before one of its cells
    /// reaches zero. 0 when the item is not contained.
    pub fn max_insert(&self, hasher: &dyn Hasher) -> i32 {
        let mut smallest = MAX_CELL;
        UniqueIndices::new(hasher, self.shape).process_indices(&mut |index| {
            let count = self.count(index).max(0);
            smallest = smallest.min(count);
            smallest > 0
        });
        smallest
    }

    /// Counter at `index`, 0 outside the filter.
    pub fn count(&self, index: i32) -> i32 {
        if index < 0 {
            return 0;
        }
        self.cells.get(index as usize).copied().unwrap_or(0)
    }

    /// Validate every cell, then write all of them.
    ///
    /// A repeated index accumulates into the same staged counter.
    fn apply(
        &mut self,
        cells: &dyn CellExtractor,
        op: fn(i32, i32) -> Option<i32>,
    ) -> Result<(), FilterError> {
        let num_bits = self.shape.num_bits();
        let mut updates: BTreeMap<usize, i32> = BTreeMap::new();
        let mut failure = None;
        cells.process_cells(&mut |index, value| {
            let updated = bit_maps::check_range(index, num_bits).and_then(|()| {
                let slot = index as usize;
                let current = updates.get(&slot).copied().unwrap_or(self.cells[slot]);
                op(current, value).ok_or(FilterError::CounterOverflow { index })
            });
            match updated {
                Ok(count) => {
                    updates.insert(index as usize, count);
                    true
                }
                Err(err) => {
                    failure = Some(err);
                    false
                }
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }

        let was_valid = self.is_valid();
        for (index, count) in updates {
            self.cells[index] = count;
        }
        if was_valid {
            if let Some(index) = self.cells.iter().position(|&count| count < 0) {
                warn!(
                    index,
                    count = self.cells[index],
                    "Counting filter is invalid: cell fell below zero"
                );
            }
        }
        Ok(())
    }
}

/// Each index of `indices` with a count of 1.
fn ones(indices: &dyn IndexExtractor) -> Vec<(i32, i32)> {
    let mut cells = Vec::new();
    indices.process_indices(&mut |index| {
        cells.push((index, 1));
        true
    });
    cells
}

impl IndexExtractor for CountingBloomFilter {
    fn process_indices(&self, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .all(|(index, _)| visit(index as i32))
    }
}

impl CellExtractor for CountingBloomFilter {
    fn process_cells(&self, visit: &mut dyn FnMut(i32, i32) -> bool) -> bool {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .all(|(index, &count)| visit(index as i32, count))
    }
}

impl BitMapExtractor for CountingBloomFilter {
    fn process_bit_maps(&self, visit: &mut dyn FnMut(u64) -> bool) -> bool {
        let mut words = vec![0u64; self.shape.num_words()];
        self.process_indices(&mut |index| {
            words[bit_maps::long_index(index)] |= bit_maps::long_bit(index);
            true
        });
        words.into_iter().all(|word| visit(word))
    }
}

impl BloomFilter for CountingBloomFilter {
    fn new_empty(shape: Shape) -> Self {
        Self::new(shape)
    }

    fn shape(&self) -> Shape {
        self.shape
    }

    fn clear(&mut self) {
        self.cells.fill(0);
    }

    fn cardinality(&self) -> i32 {
        self.cells.iter().filter(|&&count| count > 0).count() as i32
    }

    fn contains_indices(&self, indices: &dyn IndexExtractor) -> bool {
        indices.process_indices(&mut |index| self.count(index) > 0)
    }

    fn contains_bit_maps(&self, other: &dyn BitMapExtractor) -> bool {
        self.process_bit_map_pairs(other, &mut |mine, theirs| theirs & !mine == 0)
    }

    /// Increment each distinct index once.
    fn merge_indices(&mut self, indices: &dyn IndexExtractor) -> Result<(), FilterError> {
        let mut unique = ones(indices);
        unique.sort_unstable();
        unique.dedup();
        self.add(&unique)
    }

    /// Increment every enabled bit once.
    fn merge_bit_maps(&mut self, other: &dyn BitMapExtractor) -> Result<(), FilterError> {
        let num_bits = self.shape.num_bits();
        let mut cells = Vec::new();
        for (position, word) in other.as_bit_map_array().into_iter().enumerate() {
            let mut remaining = word;
            while remaining != 0 {
                let index = position as i64 * 64 + i64::from(remaining.trailing_zeros());
                if index >= i64::from(num_bits) {
                    return Err(FilterError::index_out_of_range(index, num_bits));
                }
                cells.push((index as i32, 1));
                remaining &= remaining - 1;
            }
        }
        self.add(&cells)
    }

    fn merge(&mut self, hasher: &dyn Hasher) -> Result<(), FilterError> {
        let unique = UniqueIndices::new(hasher, self.shape);
        self.add(&ones(&unique))
    }
}
