//! Seen-index tracking
//!
//! Hash sequences may repeat an index. Counting filters must bump each cell
//! once per item, so a tracker lets only the first occurrence of every index
//! through. One tracker lives for exactly one merge.

use bitvec::prelude::*;

use super::bit_maps;
use super::Shape;
use crate::error::FilterError;
use crate::ports::{Hasher, IndexExtractor};

/// Remembers which indices have been presented.
pub trait Tracker {
    /// `Ok(true)` the first time `index` is presented, `Ok(false)` afterwards.
    ///
    /// # Errors
    /// `InvalidIndex` if `index` cannot be tracked.
    fn test(&mut self, index: i32) -> Result<bool, FilterError>;
}

/// Tracker holding at most `k` distinct indices in a small array.
///
/// Suited to a single hasher's output, which never has more than `k`
/// distinct values. Presenting a `k + 1`-th distinct index is an error.
#[derive(Clone, Debug)]
pub struct ArrayTracker {
    seen: Vec<i32>,
    capacity: usize,
    num_bits: i32,
}

impl ArrayTracker {
    /// Create a tracker sized for one item of `shape`.
    pub fn new(shape: &Shape) -> Self {
        let capacity = shape.num_hashes() as usize;
        Self {
            seen: Vec::with_capacity(capacity),
            capacity,
            num_bits: shape.num_bits(),
        }
    }
}

impl Tracker for ArrayTracker {
    fn test(&mut self, index: i32) -> Result<bool, FilterError> {
        bit_maps::check_range(index, self.num_bits)?;
        if self.seen.contains(&index) {
            return Ok(false);
        }
        if self.seen.len() == self.capacity {
            return Err(FilterError::InvalidIndex {
                index: index.into(),
                reason: format!("more than {} distinct indices presented", self.capacity),
            });
        }
        self.seen.push(index);
        Ok(true)
    }
}

/// Tracker backed by a dense bitmap of `m` bits.
#[derive(Clone, Debug)]
pub struct BitMapTracker {
    bits: BitVec<u64, Lsb0>,
    num_bits: i32,
}

impl BitMapTracker {
    /// Create a tracker covering every index of `shape`.
    pub fn new(shape: &Shape) -> Self {
        Self {
            bits: bitvec![u64, Lsb0; 0; shape.num_bits() as usize],
            num_bits: shape.num_bits(),
        }
    }
}

impl Tracker for BitMapTracker {
    fn test(&mut self, index: i32) -> Result<bool, FilterError> {
        bit_maps::check_range(index, self.num_bits)?;
        let seen = self.bits.replace(index as usize, true);
        Ok(!seen)
    }
}

/// Picks the cheaper tracker for one item of a shape.
///
/// The array tracker wins while `k` indices stored as integers are no larger
/// than the bitmap, i.e. when `shape.is_sparse(k)`.
#[derive(Clone, Debug)]
pub enum IndexFilter {
    Array(ArrayTracker),
    BitMap(BitMapTracker),
}

impl IndexFilter {
    /// Create the tracker for one item of `shape`.
    pub fn new(shape: &Shape) -> Self {
        if shape.is_sparse(shape.num_hashes()) {
            Self::Array(ArrayTracker::new(shape))
        } else {
            Self::BitMap(BitMapTracker::new(shape))
        }
    }
}

impl Tracker for IndexFilter {
    fn test(&mut self, index: i32) -> Result<bool, FilterError> {
        match self {
            Self::Array(tracker) => tracker.test(index),
            Self::BitMap(tracker) => tracker.test(index),
        }
    }
}

/// The first occurrence of each index a hasher produces.
///
/// Indices the tracker rejects are passed through unchanged so that the
/// consumer's own range check reports them.
pub struct UniqueIndices<'a> {
    hasher: &'a dyn Hasher,
    shape: Shape,
}

impl<'a> UniqueIndices<'a> {
    /// Deduplicate `hasher`'s output for `shape`.
    pub fn new(hasher: &'a dyn Hasher, shape: Shape) -> Self {
        Self { hasher, shape }
    }
}

impl IndexExtractor for UniqueIndices<'_> {
    fn process_indices(&self, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        let mut filter = IndexFilter::new(&self.shape);
        self.hasher
            .process_indices(&self.shape, &mut |index| match filter.test(index) {
                Ok(true) | Err(_) => visit(index),
                Ok(false) => true,
            })
    }
}
