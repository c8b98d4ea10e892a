//! Core Bloom filter implementation
//!
//! INVARIANTS:
//! - No false negatives: once inserted, `contains()` returns true
//! - m and k are fixed at construction; querying never mutates the filter
//! - Inserting an element twice leaves the filter unchanged

use bitvec::prelude::*;

use super::hash_functions::hash_positions;
use super::parameters::{calculate_optimal_parameters, fpr_from_fill, BloomFilterParams};

/// Bloom filter for probabilistic membership testing
///
/// False positives are possible, false negatives are not. Bit `j` lives in
/// byte `j / 8` at bit `j % 8`, least significant bit first; this is the
/// layout written to shard files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloomFilter {
    /// Bit array storing the filter state
    bits: BitVec<u8, Lsb0>,
    /// Number of hash functions (k)
    k: usize,
    /// Size in bits (m)
    m: usize,
}

impl BloomFilter {
    /// Create an empty Bloom filter
    ///
    /// # Arguments
    /// * `m` - Size in bits, raised to 1 if zero
    /// * `k` - Number of hash functions, raised to 1 if zero
    pub fn new(m: usize, k: usize) -> Self {
        let m = m.max(1);
        Self {
            bits: bitvec![u8, Lsb0; 0; m],
            k: k.max(1),
            m,
        }
    }

    /// Create an empty filter from sized parameters
    pub fn from_params(params: &BloomFilterParams) -> Self {
        Self::new(params.size_bits, params.hash_count)
    }

    /// Create an empty filter with optimal parameters for a target FPR
    pub fn new_with_fpr(expected_elements: usize, target_fpr: f64) -> Self {
        Self::from_params(&calculate_optimal_parameters(expected_elements, target_fpr))
    }

    /// Rebuild a filter from its packed little-endian bit bytes.
    ///
    /// Callers must pass exactly `ceil(m / 8)` bytes.
    pub(crate) fn from_raw_parts(m: usize, k: usize, bytes: Vec<u8>) -> Self {
        let mut bits = BitVec::<u8, Lsb0>::from_vec(bytes);
        bits.truncate(m);
        Self { bits, k, m }
    }

    /// Packed bit array, `ceil(m / 8)` bytes
    pub fn as_raw_bytes(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }

    /// Insert an element into the filter
    pub fn insert(&mut self, element: &[u8]) {
        for pos in hash_positions(element, self.k, self.m) {
            self.bits.set(pos, true);
        }
    }

    /// Test if an element might be in the filter
    ///
    /// Returns:
    /// - `true` if the element might be in the set (could be false positive)
    /// - `false` if the element is definitely NOT in the set
    pub fn contains(&self, element: &[u8]) -> bool {
        hash_positions(element, self.k, self.m).all(|pos| self.bits[pos])
    }

    /// Get the number of bits set in the filter
    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// Fraction of bits set
    pub fn fill_ratio(&self) -> f64 {
        self.bits_set() as f64 / self.m as f64
    }

    /// False positive rate estimated from the current fill
    pub fn estimated_fpr(&self) -> f64 {
        fpr_from_fill(self.bits_set(), self.m, self.k)
    }

    /// Get the filter size in bits
    pub fn size_bits(&self) -> usize {
        self.m
    }

    /// Get the number of hash functions
    pub fn hash_count(&self) -> usize {
        self.k
    }
}
