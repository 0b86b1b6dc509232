//! Outbound Ports (Driven Ports)
//!
//! What the core consumes from its environment: a deterministic source of bit
//! indices per item.

use super::extract::IndexExtractor;
use crate::domain::Shape;

/// Deterministic generator of bit indices for one item.
///
/// Contract for implementors:
/// - exactly `shape.num_hashes()` indices are visited, each in `[0, shape.num_bits())`
/// - the sequence may repeat an index (hash collisions)
/// - the same hasher and shape always produce the same sequence
pub trait Hasher {
    /// Visit the item's indices for `shape`, stopping when `visit` returns `false`.
    fn process_indices(&self, shape: &Shape, visit: &mut dyn FnMut(i32) -> bool) -> bool;
}

/// A hasher bound to a shape, usable wherever an [`IndexExtractor`] is expected.
pub struct HasherIndices<'a> {
    hasher: &'a dyn Hasher,
    shape: Shape,
}

impl<'a> HasherIndices<'a> {
    /// Bind `hasher` to `shape`.
    pub fn new(hasher: &'a dyn Hasher, shape: Shape) -> Self {
        Self { hasher, shape }
    }
}

impl IndexExtractor for HasherIndices<'_> {
    fn process_indices(&self, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        self.hasher.process_indices(&self.shape, visit)
    }
}
