//! Build and query configuration
//!
//! # Example
//!
//! ```ignore
//! use shard_filters::domain::{BuildConfigBuilder, ShardSizing, Sizing};
//!
//! let config = BuildConfigBuilder::new()
//!     .expected_elements(2_000_000)
//!     .sizing(Sizing::TargetFpr(0.001))
//!     .strategy(ShardSizing::Uniform)
//!     .build()
//!     .expect("Valid config");
//! ```

use serde::{Deserialize, Serialize};

use super::parameters::{
    calculate_optimal_parameters, parameters_for_hash_count, BloomFilterParams, MAX_HASH_COUNT,
};
use crate::error::FilterError;

/// How (m, k) is derived from an element count
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Sizing {
    /// Size for a target false positive rate
    TargetFpr(f64),
    /// Fixed hash count, m chosen so that k is optimal
    HashCount(usize),
    /// Fixed (m, k), independent of the element count
    Explicit { m: usize, k: usize },
}

impl Sizing {
    /// Parameters for `elements` expected elements
    pub fn parameters(&self, elements: usize) -> BloomFilterParams {
        match *self {
            Sizing::TargetFpr(p) => calculate_optimal_parameters(elements, p),
            Sizing::HashCount(k) => parameters_for_hash_count(elements, k),
            Sizing::Explicit { m, k } => BloomFilterParams {
                size_bits: m,
                hash_count: k,
                expected_fpr: super::parameters::calculate_fpr(m, elements, k),
            },
        }
    }
}

/// Whether every shard shares one parameter pair
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardSizing {
    /// One (m, k) for all 256 shards, sized from `expected_elements`
    #[default]
    Uniform,
    /// Each shard sized from its own element count (counting pre-pass)
    PerShard,
}

/// Filter build configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Expected elements per shard (N)
    pub expected_elements: usize,
    /// Sizing rule
    pub sizing: Sizing,
    /// Uniform or per-shard sizing
    pub strategy: ShardSizing,
    /// Log progress every this many corpus lines
    pub progress_interval: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            expected_elements: 2_000_000,
            sizing: Sizing::TargetFpr(0.001),
            strategy: ShardSizing::Uniform,
            progress_interval: 1_000_000,
        }
    }
}

impl BuildConfig {
    /// Validate sizing bounds
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.expected_elements == 0 {
            return Err(FilterError::InvalidParameters(
                "expected_elements cannot be 0".to_string(),
            ));
        }

        match self.sizing {
            Sizing::TargetFpr(p) if !(p > 0.0 && p < 1.0) => {
                return Err(FilterError::InvalidParameters(format!(
                    "target false positive rate {} must be in (0, 1)",
                    p
                )));
            }
            Sizing::HashCount(k) | Sizing::Explicit { k, .. }
                if k == 0 || k > MAX_HASH_COUNT =>
            {
                return Err(FilterError::InvalidParameters(format!(
                    "hash count {} must be in 1..={}",
                    k, MAX_HASH_COUNT
                )));
            }
            Sizing::Explicit { m: 0, .. } => {
                return Err(FilterError::InvalidParameters(
                    "filter size m cannot be 0".to_string(),
                ));
            }
            _ => {}
        }

        if self.progress_interval == 0 {
            return Err(FilterError::InvalidParameters(
                "progress_interval cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parameters shared by every shard under uniform sizing
    pub fn uniform_parameters(&self) -> BloomFilterParams {
        self.sizing.parameters(self.expected_elements)
    }

    /// Parameters for a shard holding `count` elements under per-shard sizing
    pub fn shard_parameters(&self, count: usize) -> BloomFilterParams {
        match self.strategy {
            ShardSizing::Uniform => self.uniform_parameters(),
            ShardSizing::PerShard => self.sizing.parameters(count.max(1)),
        }
    }

    /// Target rate the built filters should stay under, if one applies
    pub fn target_fpr(&self) -> Option<f64> {
        match self.sizing {
            Sizing::TargetFpr(p) => Some(p),
            _ => None,
        }
    }
}

/// Builder for BuildConfig with validation
#[derive(Default)]
pub struct BuildConfigBuilder {
    expected_elements: Option<usize>,
    sizing: Option<Sizing>,
    strategy: Option<ShardSizing>,
    progress_interval: Option<u64>,
}

impl BuildConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Expected elements per shard
    pub fn expected_elements(mut self, elements: usize) -> Self {
        self.expected_elements = Some(elements);
        self
    }

    /// Sizing rule
    pub fn sizing(mut self, sizing: Sizing) -> Self {
        self.sizing = Some(sizing);
        self
    }

    /// Uniform or per-shard sizing
    pub fn strategy(mut self, strategy: ShardSizing) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Progress log interval in corpus lines
    pub fn progress_interval(mut self, lines: u64) -> Self {
        self.progress_interval = Some(lines);
        self
    }

    /// Build the BuildConfig, validating all parameters
    pub fn build(self) -> Result<BuildConfig, FilterError> {
        let defaults = BuildConfig::default();

        let config = BuildConfig {
            expected_elements: self.expected_elements.unwrap_or(defaults.expected_elements),
            sizing: self.sizing.unwrap_or(defaults.sizing),
            strategy: self.strategy.unwrap_or(defaults.strategy),
            progress_interval: self.progress_interval.unwrap_or(defaults.progress_interval),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Query-side configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Decoded filters kept in memory; 0 disables the cache
    pub cache_capacity: usize,
}
