//! Error types for the Bloom filter core
//!
//! Every failure is structural: bad construction parameters, an index outside
//! the shape, or an attempt to combine filters of different shapes. Nothing
//! here is transient, so no operation retries internally.

use thiserror::Error;

use crate::domain::Shape;

/// Errors that can occur while building or mutating a filter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid index {index}: {reason}")]
    InvalidIndex { index: i64, reason: String },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: Shape, actual: Shape },

    #[error("Counter overflow at index {index}")]
    CounterOverflow { index: i32 },
}

// Convenient constructors used within the crate.
impl FilterError {
    pub(crate) fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub(crate) fn index_out_of_range(index: impl Into<i64>, num_bits: i32) -> Self {
        Self::InvalidIndex {
            index: index.into(),
            reason: format!("expected a value in [0, {num_bits})"),
        }
    }

    pub(crate) fn shape_mismatch(expected: Shape, actual: Shape) -> Self {
        Self::ShapeMismatch { expected, actual }
    }
}
