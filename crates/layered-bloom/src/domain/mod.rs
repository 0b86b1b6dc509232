//! Domain Layer - Pure filter logic
//!
//! This layer contains:
//! - Shape calculus (sizing and probability formulas)
//! - Hashers and seen-index trackers
//! - Plain, counting and layered Bloom filters
//! - Layer lifecycle configuration
//! - Set operations over bit maps
//!
//! RULES:
//! - No I/O operations
//! - No async code
//! - No internal synchronization; share a filter behind your own lock

pub mod bit_maps;
pub mod bloom_filter;
pub mod cells;
pub mod config;
pub mod counting_bloom;
pub mod hashers;
pub mod index_filter;
pub mod layered;
pub mod set_operations;
pub mod shape;

pub use bloom_filter::SimpleBloomFilter;
pub use cells::Cells;
pub use config::{ExtendCheck, LayerPolicy, LayerPolicyBuilder};
pub use counting_bloom::{CountingBloomFilter, MAX_CELL};
pub use hashers::{EnhancedDoubleHasher, IncrementingHasher};
pub use index_filter::{ArrayTracker, BitMapTracker, IndexFilter, Tracker, UniqueIndices};
pub use layered::LayeredBloomFilter;
pub use shape::Shape;
