//! Layer lifecycle configuration and validation
//!
//! A `LayerPolicy` tells a layered filter when its newest layer is full and
//! how many layers may stay live before the oldest is retired.
//!
//! # Example
//!
//! ```
//! use layered_bloom::domain::{ExtendCheck, LayerPolicyBuilder};
//!
//! let policy = LayerPolicyBuilder::new()
//!     .extend_check(ExtendCheck::OnCount(1000))
//!     .max_layers(10)
//!     .build()
//!     .expect("Valid policy");
//! assert_eq!(policy.max_layers, Some(10));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::ports::BloomFilter;

/// When the newest layer counts as full and a fresh one is appended.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtendCheck {
    /// Never advance on its own; only `next()` appends a layer
    Never,
    /// Advance after every merge into a non-empty layer
    OnPopulated,
    /// Advance once the layer has taken this many merges
    OnCount(usize),
    /// Advance once the layer's estimated item count reaches this bound
    OnSaturation(f64),
}

impl ExtendCheck {
    /// Whether `layer`, after `merges` merges, should be closed.
    pub fn is_full<F: BloomFilter>(&self, layer: &F, merges: usize) -> bool {
        match *self {
            Self::Never => false,
            Self::OnPopulated => !layer.is_empty(),
            Self::OnCount(limit) => merges >= limit,
            Self::OnSaturation(max_n) => {
                let estimate = layer.shape().estimate_n(layer.cardinality());
                estimate.is_nan() || estimate >= max_n
            }
        }
    }
}

/// Layer lifecycle policy
///
/// `max_layers` of `None` lets the filter grow without bound.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerPolicy {
    /// When to append a new layer
    pub extend: ExtendCheck,
    /// Live layer limit; the oldest layer is evicted beyond it
    pub max_layers: Option<usize>,
}

impl Default for LayerPolicy {
    fn default() -> Self {
        Self {
            extend: ExtendCheck::OnPopulated,
            max_layers: None,
        }
    }
}

impl LayerPolicy {
    /// Create a new policy with validation
    pub fn new(extend: ExtendCheck, max_layers: Option<usize>) -> Result<Self, FilterError> {
        let policy = Self { extend, max_layers };
        policy.validate()?;
        Ok(policy)
    }

    /// `depth` layers that never advance on their own.
    pub fn fixed(depth: usize) -> Result<Self, FilterError> {
        Self::new(ExtendCheck::Never, Some(depth))
    }

    /// Validate the policy bounds
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.max_layers == Some(0) {
            return Err(FilterError::invalid_parameter("max_layers cannot be 0"));
        }

        match self.extend {
            ExtendCheck::OnCount(0) => Err(FilterError::invalid_parameter(
                "merge count per layer cannot be 0",
            )),
            ExtendCheck::OnSaturation(max_n) if !max_n.is_finite() || max_n <= 0.0 => {
                Err(FilterError::invalid_parameter(format!(
                    "saturation bound must be finite and positive: {max_n}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Builder-style method to set the extend check
    pub fn with_extend_check(mut self, extend: ExtendCheck) -> Self {
        self.extend = extend;
        self
    }

    /// Builder-style method to set the layer limit
    pub fn with_max_layers(mut self, max_layers: usize) -> Self {
        self.max_layers = Some(max_layers);
        self
    }
}

/// Builder for LayerPolicy with validation
#[derive(Default)]
pub struct LayerPolicyBuilder {
    extend: Option<ExtendCheck>,
    max_layers: Option<usize>,
}

impl LayerPolicyBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set when the newest layer is closed
    pub fn extend_check(mut self, extend: ExtendCheck) -> Self {
        self.extend = Some(extend);
        self
    }

    /// Set the live layer limit (must be at least 1)
    pub fn max_layers(mut self, max_layers: usize) -> Self {
        self.max_layers = Some(max_layers);
        self
    }

    /// Build the LayerPolicy, validating all parameters
    pub fn build(self) -> Result<LayerPolicy, FilterError> {
        let defaults = LayerPolicy::default();
        LayerPolicy::new(
            self.extend.unwrap_or(defaults.extend),
            self.max_layers.or(defaults.max_layers),
        )
    }
}
