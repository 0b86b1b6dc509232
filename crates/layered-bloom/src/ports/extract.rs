//! Extraction ports
//!
//! The bulk-read and interop surface of every filter. Each extractor walks its
//! state in order and hands values to a visitor; the visitor returns `false`
//! to stop early, in which case the walk itself returns `false`.
//!
//! - `IndexExtractor`: enabled bit indices
//! - `BitMapExtractor`: packed `u64` words, word `i` covering bits `[64i, 64i + 64)`
//! - `CellExtractor`: `(index, count)` pairs in ascending index order

use crate::domain::bit_maps;
use crate::error::FilterError;

/// A source of bit indices.
///
/// Order and uniqueness depend on the implementation: a hasher may repeat
/// indices, a filter reports each enabled index once in ascending order.
pub trait IndexExtractor {
    /// Visit each index, stopping when `visit` returns `false`.
    ///
    /// Returns `false` if the walk was stopped early.
    fn process_indices(&self, visit: &mut dyn FnMut(i32) -> bool) -> bool;

    /// Collect every index into a vector.
    fn as_index_array(&self) -> Vec<i32> {
        let mut indices = Vec::new();
        self.process_indices(&mut |index| {
            indices.push(index);
            true
        });
        indices
    }
}

/// A source of packed bit map words.
pub trait BitMapExtractor {
    /// Visit each word in order, stopping when `visit` returns `false`.
    fn process_bit_maps(&self, visit: &mut dyn FnMut(u64) -> bool) -> bool;

    /// Collect every word into a vector.
    fn as_bit_map_array(&self) -> Vec<u64> {
        let mut words = Vec::new();
        self.process_bit_maps(&mut |word| {
            words.push(word);
            true
        });
        words
    }

    /// Visit this extractor's words paired with `other`'s.
    ///
    /// The shorter side is padded with zero words so every word of both
    /// extractors is seen exactly once.
    fn process_bit_map_pairs(
        &self,
        other: &dyn BitMapExtractor,
        visit: &mut dyn FnMut(u64, u64) -> bool,
    ) -> bool {
        let other_words = other.as_bit_map_array();
        let mut position = 0;
        let completed = self.process_bit_maps(&mut |word| {
            let paired = other_words.get(position).copied().unwrap_or(0);
            position += 1;
            visit(word, paired)
        });
        completed
            && other_words
                .iter()
                .skip(position)
                .all(|&paired| visit(0, paired))
    }
}

/// A source of `(index, count)` cells.
///
/// Indices are strictly ascending and every count is at least 1. A plain
/// filter reports a count of 1 for each enabled bit.
pub trait CellExtractor: IndexExtractor {
    /// Visit each cell, stopping when `visit` returns `false`.
    fn process_cells(&self, visit: &mut dyn FnMut(i32, i32) -> bool) -> bool;

    /// Collect every cell into a vector.
    fn as_cell_array(&self) -> Vec<(i32, i32)> {
        let mut cells = Vec::new();
        self.process_cells(&mut |index, count| {
            cells.push((index, count));
            true
        });
        cells
    }
}

/// Pack the indices of `indices` into the bit maps of an `num_bits` wide filter.
///
/// # Errors
/// `InvalidIndex` on the first index outside `[0, num_bits)`.
pub fn bit_maps_from_indices(
    indices: &dyn IndexExtractor,
    num_bits: i32,
) -> Result<Vec<u64>, FilterError> {
    let mut words = vec![0u64; bit_maps::number_of_bit_maps(num_bits)];
    let mut failure = None;
    indices.process_indices(&mut |index| {
        match bit_maps::check_range(index, num_bits).and_then(|()| bit_maps::set(&mut words, index)) {
            Ok(()) => true,
            Err(err) => {
                failure = Some(err);
                false
            }
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(words),
    }
}

impl IndexExtractor for [i32] {
    fn process_indices(&self, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        self.iter().all(|&index| visit(index))
    }
}

impl IndexExtractor for Vec<i32> {
    fn process_indices(&self, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        self.as_slice().process_indices(visit)
    }
}

impl<const N: usize> IndexExtractor for [i32; N] {
    fn process_indices(&self, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        self.as_slice().process_indices(visit)
    }
}

impl BitMapExtractor for [u64] {
    fn process_bit_maps(&self, visit: &mut dyn FnMut(u64) -> bool) -> bool {
        self.iter().all(|&word| visit(word))
    }
}

impl BitMapExtractor for Vec<u64> {
    fn process_bit_maps(&self, visit: &mut dyn FnMut(u64) -> bool) -> bool {
        self.as_slice().process_bit_maps(visit)
    }
}

impl<const N: usize> BitMapExtractor for [u64; N] {
    fn process_bit_maps(&self, visit: &mut dyn FnMut(u64) -> bool) -> bool {
        self.as_slice().process_bit_maps(visit)
    }
}

/// Cell slices report their pairs in stored order; callers keep them sorted.
impl IndexExtractor for [(i32, i32)] {
    fn process_indices(&self, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        self.iter().all(|&(index, _)| visit(index))
    }
}

impl CellExtractor for [(i32, i32)] {
    fn process_cells(&self, visit: &mut dyn FnMut(i32, i32) -> bool) -> bool {
        self.iter().all(|&(index, count)| visit(index, count))
    }
}

impl IndexExtractor for Vec<(i32, i32)> {
    fn process_indices(&self, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        self.as_slice().process_indices(visit)
    }
}

impl CellExtractor for Vec<(i32, i32)> {
    fn process_cells(&self, visit: &mut dyn FnMut(i32, i32) -> bool) -> bool {
        self.as_slice().process_cells(visit)
    }
}
