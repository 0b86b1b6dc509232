//! # Layered Bloom
//!
//! Probabilistic set membership: Bloom filter shape calculus, index
//! generation, bit and cell extraction, and layered (multi-generation)
//! Bloom filters for rolling windows over unbounded streams.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `Shape`: validated `(k, m)` pair with sizing and estimation formulas
//!   - `EnhancedDoubleHasher`, `IncrementingHasher`: index generators
//!   - `SimpleBloomFilter`: plain filter, sparse or dense internally
//!   - `CountingBloomFilter`: one counter per bit, supports removal
//!   - `LayeredBloomFilter`: bounded queue of layers under a `LayerPolicy`
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `BloomFilter`: Driving port (mutation and query surface)
//!   - `Hasher`: Driven port (per-item index source)
//!   - `IndexExtractor`, `BitMapExtractor`, `CellExtractor`: bulk read
//!
//! ## Invariants
//!
//! - Every enabled index lies in `[0, m)`
//! - No false negatives: after `merge(h)`, `contains(h)` MUST return true
//!   until the filter is cleared or the layer holding `h` is evicted
//!
//! ## Usage Example
//!
//! ```
//! use layered_bloom::{
//!     BloomFilter, EnhancedDoubleHasher, ExtendCheck, LayerPolicyBuilder, LayeredBloomFilter,
//!     Shape,
//! };
//!
//! let shape = Shape::from_np(1000, 0.01)?;
//! let policy = LayerPolicyBuilder::new()
//!     .extend_check(ExtendCheck::OnCount(1000))
//!     .max_layers(4)
//!     .build()?;
//!
//! let mut filter = LayeredBloomFilter::new(shape, policy)?;
//! filter.merge(&EnhancedDoubleHasher::from_bytes(b"0xABCD"))?;
//!
//! assert!(filter.contains(&EnhancedDoubleHasher::from_bytes(b"0xABCD")));
//! # Ok::<(), layered_bloom::FilterError>(())
//! ```
//!
//! Filters are not internally synchronized. Wrap one in a lock to share it,
//! or merge independent clones afterwards.

pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use domain::{
    set_operations, CountingBloomFilter, EnhancedDoubleHasher, ExtendCheck, IncrementingHasher,
    LayerPolicy, LayerPolicyBuilder, LayeredBloomFilter, Shape, SimpleBloomFilter,
};
pub use error::FilterError;
pub use ports::{BitMapExtractor, BloomFilter, CellExtractor, Hasher, IndexExtractor};
