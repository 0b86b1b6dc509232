//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - the filter API callers mutate and query through
//! - Driven Ports (outbound) - the index source the core consumes
//! - Extraction - the bulk-read and interop surface shared by both sides

pub mod extract;
pub mod inbound;
pub mod outbound;

pub use extract::{bit_maps_from_indices, BitMapExtractor, CellExtractor, IndexExtractor};
pub use inbound::BloomFilter;
pub use outbound::{Hasher, HasherIndices};
