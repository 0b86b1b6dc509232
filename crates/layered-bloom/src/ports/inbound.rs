//! Inbound Ports (Driving Ports)
//!
//! `BloomFilter` is the only mutation and query surface the core exposes.
//! Every filter also is an `IndexExtractor` and a `BitMapExtractor`, which is
//! how filters are read out and combined.
//!
//! INVARIANTS:
//! - Every enabled index lies in `[0, m)`
//! - No false negatives: after `merge(h)`, `contains(h)` MUST return true
//!   until `clear()`

use super::extract::{BitMapExtractor, IndexExtractor};
use super::outbound::{Hasher, HasherIndices};
use crate::domain::{set_operations, Shape};
use crate::error::FilterError;

/// A mutable Bloom filter of a fixed [`Shape`].
pub trait BloomFilter: IndexExtractor + BitMapExtractor {
    /// Create an empty filter of `shape`.
    fn new_empty(shape: Shape) -> Self
    where
        Self: Sized;

    /// The shape every operation on this filter is checked against.
    fn shape(&self) -> Shape;

    /// Whether the filter is cheaper to read as indices than as bit maps.
    fn is_sparse(&self) -> bool {
        false
    }

    /// Reset to the empty state, keeping the shape.
    fn clear(&mut self);

    /// Number of enabled bits.
    fn cardinality(&self) -> i32;

    /// True if every index of `indices` is enabled.
    fn contains_indices(&self, indices: &dyn IndexExtractor) -> bool;

    /// True if every bit enabled in `bit_maps` is enabled here.
    fn contains_bit_maps(&self, bit_maps: &dyn BitMapExtractor) -> bool;

    /// Enable every index of `indices`.
    ///
    /// Only the range of each index is checked, not the shape of its source.
    /// [`BloomFilter::merge_filter`] is the shape-checked entry point.
    ///
    /// # Errors
    /// `InvalidIndex` for an index outside `[0, m)`. Indices visited before
    /// the offending one stay merged.
    fn merge_indices(&mut self, indices: &dyn IndexExtractor) -> Result<(), FilterError>;

    /// OR `bit_maps` into this filter.
    ///
    /// Words from a filter of another shape are accepted as long as no bit
    /// lands at or beyond `m`. Use [`BloomFilter::merge_filter`] to reject a
    /// source whose shape differs.
    ///
    /// # Errors
    /// `InvalidIndex` if `bit_maps` enables a bit at or beyond `m`.
    fn merge_bit_maps(&mut self, bit_maps: &dyn BitMapExtractor) -> Result<(), FilterError>;

    /// True if all of `hasher`'s `k` indices are enabled.
    fn contains(&self, hasher: &dyn Hasher) -> bool {
        self.contains_indices(&HasherIndices::new(hasher, self.shape()))
    }

    /// True if every bit enabled in `other` is enabled here.
    fn contains_filter<F: BloomFilter>(&self, other: &F) -> bool
    where
        Self: Sized,
    {
        if other.is_sparse() {
            self.contains_indices(other)
        } else {
            self.contains_bit_maps(other)
        }
    }

    /// Merge one item's indices.
    ///
    /// # Errors
    /// `InvalidIndex` if the hasher does not honour the shape.
    fn merge(&mut self, hasher: &dyn Hasher) -> Result<(), FilterError> {
        let shape = self.shape();
        self.merge_indices(&HasherIndices::new(hasher, shape))
    }

    /// Union `other` into this filter.
    ///
    /// # Errors
    /// `ShapeMismatch` if the shapes differ.
    fn merge_filter<F: BloomFilter>(&mut self, other: &F) -> Result<(), FilterError>
    where
        Self: Sized,
    {
        check_same_shape(self.shape(), other.shape())?;
        if other.is_sparse() {
            self.merge_indices(other)
        } else {
            self.merge_bit_maps(other)
        }
    }

    fn is_empty(&self) -> bool {
        self.cardinality() == 0
    }

    /// True when every bit is enabled; such a filter contains everything.
    fn is_full(&self) -> bool {
        self.cardinality() == self.shape().num_bits()
    }

    /// Estimated number of items merged so far.
    ///
    /// A saturated filter reports `i32::MAX`.
    ///
    /// # Errors
    /// `InvalidParameter` if the cardinality exceeds `m`.
    fn estimate_n(&self) -> Result<i32, FilterError> {
        estimate_from(self.shape(), self.cardinality())
    }

    /// Estimated number of items in the union of this filter and `other`.
    ///
    /// # Errors
    /// `ShapeMismatch` if the shapes differ.
    fn estimate_union<F: BloomFilter>(&self, other: &F) -> Result<i32, FilterError>
    where
        Self: Sized,
    {
        check_same_shape(self.shape(), other.shape())?;
        let union = set_operations::or_cardinality(self, other);
        estimate_from(self.shape(), union)
    }

    /// Estimated number of items present in both this filter and `other`.
    ///
    /// When one side is saturated the other side's estimate is returned.
    ///
    /// # Errors
    /// `ShapeMismatch` if the shapes differ, `InvalidParameter` if only the
    /// union is saturated.
    fn estimate_intersection<F: BloomFilter>(&self, other: &F) -> Result<i32, FilterError>
    where
        Self: Sized,
    {
        let shape = self.shape();
        check_same_shape(shape, other.shape())?;
        let this_n = shape.estimate_n(self.cardinality());
        let other_n = shape.estimate_n(other.cardinality());

        let estimate = match (this_n.is_infinite(), other_n.is_infinite()) {
            (true, true) => return Ok(i32::MAX),
            (true, false) => other_n.round(),
            (false, true) => this_n.round(),
            (false, false) => {
                let union_n = shape.estimate_n(set_operations::or_cardinality(self, other));
                if union_n.is_infinite() {
                    return Err(FilterError::invalid_parameter(
                        "The estimated N for the union of the filters is infinite",
                    ));
                }
                (this_n + other_n - union_n).round().max(0.0)
            }
        };
        // Saturating float-to-int cast
        Ok(estimate as i32)
    }
}

fn check_same_shape(expected: Shape, actual: Shape) -> Result<(), FilterError> {
    if expected != actual {
        return Err(FilterError::shape_mismatch(expected, actual));
    }
    Ok(())
}

fn estimate_from(shape: Shape, cardinality: i32) -> Result<i32, FilterError> {
    let estimate = shape.estimate_n(cardinality);
    if estimate.is_nan() {
        return Err(FilterError::invalid_parameter(format!(
            "Cardinality too large: {cardinality} > {}",
            shape.num_bits()
        )));
    }
    if estimate.is_infinite() {
        return Ok(i32::MAX);
    }
    Ok(estimate.round() as i32)
}
