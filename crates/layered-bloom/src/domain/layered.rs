//! Layered Bloom filter
//!
//! An ordered run of same-shape layers, oldest first. Items always go into
//! the newest layer; the `LayerPolicy` decides when that layer is closed and
//! a fresh one appended, and how many layers stay live.
//!
//! Membership is the OR across layers. Extraction reports the union of all
//! layers as if they were one flat filter of the same shape.
//!
//! Evicting the oldest layer drops its items for good. A rolling window of
//! layers trades those losses for a bounded false positive rate over an
//! unbounded stream.

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::config::LayerPolicy;
use super::{Shape, SimpleBloomFilter};
use crate::error::FilterError;
use crate::ports::{BitMapExtractor, BloomFilter, CellExtractor, Hasher, IndexExtractor};

/// One generation: a filter plus the number of merges it has taken.
#[derive(Clone, Debug)]
struct Layer<T> {
    filter: T,
    merges: usize,
}

impl<T: BloomFilter> Layer<T> {
    fn new(shape: Shape) -> Self {
        Self {
            filter: T::new_empty(shape),
            merges: 0,
        }
    }

    fn reset(&mut self) {
        self.filter.clear();
        self.merges = 0;
    }
}

/// Bloom filter made of a bounded queue of layers.
///
/// Layer `0` is the oldest; the last layer is the current one.
#[derive(Clone, Debug)]
pub struct LayeredBloomFilter<T = SimpleBloomFilter> {
    shape: Shape,
    policy: LayerPolicy,
    initial_depth: usize,
    /// Closed layers, oldest first
    older: VecDeque<Layer<T>>,
    /// Layer receiving merges
    newest: Layer<T>,
}

impl LayeredBloomFilter {
    /// A layered filter of [`SimpleBloomFilter`] layers.
    ///
    /// # Errors
    /// `InvalidParameter` if `policy` fails validation.
    pub fn new(shape: Shape, policy: LayerPolicy) -> Result<Self, FilterError> {
        Self::with_policy(shape, policy)
    }

    /// `depth` empty [`SimpleBloomFilter`] layers that never advance on
    /// their own.
    ///
    /// # Errors
    /// `InvalidParameter` if `depth` is 0.
    pub fn fixed(shape: Shape, depth: usize) -> Result<Self, FilterError> {
        Self::with_fixed_depth(shape, depth)
    }
}

impl<T: BloomFilter> LayeredBloomFilter<T> {
    /// Start with a single empty layer governed by `policy`.
    pub fn with_policy(shape: Shape, policy: LayerPolicy) -> Result<Self, FilterError> {
        policy.validate()?;
        Ok(Self::build(shape, policy, 1))
    }

    /// Preallocate `depth` empty layers under [`LayerPolicy::fixed`].
    pub fn with_fixed_depth(shape: Shape, depth: usize) -> Result<Self, FilterError> {
        let policy = LayerPolicy::fixed(depth)?;
        Ok(Self::build(shape, policy, depth))
    }

    fn build(shape: Shape, policy: LayerPolicy, depth: usize) -> Self {
        let older = (1..depth).map(|_| Layer::new(shape)).collect();
        Self {
            shape,
            policy,
            initial_depth: depth,
            older,
            newest: Layer::new(shape),
        }
    }

    pub fn policy(&self) -> &LayerPolicy {
        &self.policy
    }

    /// Number of live layers.
    pub fn depth(&self) -> usize {
        self.older.len() + 1
    }

    /// Layer `index`, counting from the oldest.
    pub fn get(&self, index: usize) -> Option<&T> {
        match index.cmp(&self.older.len()) {
            std::cmp::Ordering::Less => self.older.get(index).map(|layer| &layer.filter),
            std::cmp::Ordering::Equal => Some(&self.newest.filter),
            std::cmp::Ordering::Greater => None,
        }
    }

    /// All live layers, oldest first.
    pub fn layers(&self) -> impl Iterator<Item = &T> + '_ {
        self.older
            .iter()
            .chain(std::iter::once(&self.newest))
            .map(|layer| &layer.filter)
    }

    /// The layer currently receiving merges.
    pub fn current(&self) -> &T {
        &self.newest.filter
    }

    /// Indices of the layers that contain `hasher`, oldest first.
    pub fn find(&self, hasher: &dyn Hasher) -> Vec<usize> {
        self.layers()
            .enumerate()
            .filter(|(_, layer)| layer.contains(hasher))
            .map(|(index, _)| index)
            .collect()
    }

    /// Close the current layer and start a new one.
    ///
    /// At the layer limit the oldest layer is evicted and its storage reused
    /// for the new layer.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) {
        let depth = self.depth();
        let at_limit = self.policy.max_layers.is_some_and(|max| depth >= max);
        if !at_limit {
            let closed = std::mem::replace(&mut self.newest, Layer::new(self.shape));
            self.older.push_back(closed);
            debug!(depth = self.depth(), "Appended layer");
            return;
        }

        let evicted = match self.older.pop_front() {
            Some(mut oldest) => {
                let cardinality = oldest.filter.cardinality();
                oldest.reset();
                let closed = std::mem::replace(&mut self.newest, oldest);
                self.older.push_back(closed);
                cardinality
            }
            // A single-layer limit: the current layer is also the oldest.
            None => {
                let cardinality = self.newest.filter.cardinality();
                self.newest.reset();
                cardinality
            }
        };
        debug!(depth, evicted_cardinality = evicted, "Evicted oldest layer");
    }

    /// Union of every layer as one plain filter.
    pub fn flatten(&self) -> SimpleBloomFilter {
        SimpleBloomFilter::from_bit_maps(self.shape, self.union_words())
    }

    fn union_words(&self) -> Vec<u64> {
        let mut words = vec![0u64; self.shape.num_words()];
        for layer in self.layers() {
            let mut position = 0;
            layer.process_bit_maps(&mut |word| {
                if let Some(slot) = words.get_mut(position) {
                    *slot |= word;
                }
                position += 1;
                true
            });
        }
        words
    }

    /// Count the merge and advance if the policy says the layer is full.
    fn after_merge(&mut self) {
        self.newest.merges += 1;
        trace!(
            depth = self.depth(),
            merges = self.newest.merges,
            cardinality = self.newest.filter.cardinality(),
            "Merged into current layer"
        );
        if self
            .policy
            .extend
            .is_full(&self.newest.filter, self.newest.merges)
        {
            self.next();
        }
    }
}

impl<T: BloomFilter> IndexExtractor for LayeredBloomFilter<T> {
    fn process_indices(&self, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        self.flatten().process_indices(visit)
    }
}

impl<T: BloomFilter> BitMapExtractor for LayeredBloomFilter<T> {
    fn process_bit_maps(&self, visit: &mut dyn FnMut(u64) -> bool) -> bool {
        self.union_words().into_iter().all(|word| visit(word))
    }
}

impl<T: BloomFilter> CellExtractor for LayeredBloomFilter<T> {
    fn process_cells(&self, visit: &mut dyn FnMut(i32, i32) -> bool) -> bool {
        self.process_indices(&mut |index| visit(index, 1))
    }
}

impl<T: BloomFilter> BloomFilter for LayeredBloomFilter<T> {
    fn new_empty(shape: Shape) -> Self {
        Self::build(shape, LayerPolicy::default(), 1)
    }

    fn shape(&self) -> Shape {
        self.shape
    }

    /// Restore the layer count the filter was built with, all layers empty.
    fn clear(&mut self) {
        self.older.clear();
        self.newest.reset();
        for _ in 1..self.initial_depth {
            self.older.push_back(Layer::new(self.shape));
        }
    }

    fn cardinality(&self) -> i32 {
        self.union_words()
            .iter()
            .map(|word| word.count_ones() as i32)
            .sum()
    }

    fn contains_indices(&self, indices: &dyn IndexExtractor) -> bool {
        self.layers().any(|layer| layer.contains_indices(indices))
    }

    fn contains_bit_maps(&self, other: &dyn BitMapExtractor) -> bool {
        self.layers().any(|layer| layer.contains_bit_maps(other))
    }

    fn merge_indices(&mut self, indices: &dyn IndexExtractor) -> Result<(), FilterError> {
        self.newest.filter.merge_indices(indices)?;
        self.after_merge();
        Ok(())
    }

    fn merge_bit_maps(&mut self, other: &dyn BitMapExtractor) -> Result<(), FilterError> {
        self.newest.filter.merge_bit_maps(other)?;
        self.after_merge();
        Ok(())
    }

    fn merge(&mut self, hasher: &dyn Hasher) -> Result<(), FilterError> {
        self.newest.filter.merge(hasher)?;
        self.after_merge();
        Ok(())
    }
}
